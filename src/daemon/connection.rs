//! WebSocket connection handler
//!
//! One task per client. Requests on a connection are answered in order.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

use crate::daemon::protocol::{ClientMessage, ServerMessage};
use crate::daemon::DaemonState;

/// Handle a single WebSocket connection
pub async fn handle_connection(stream: TcpStream, state: Arc<DaemonState>) {
    let addr = stream.peer_addr().ok();

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::error!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let mut conn = ConnectionState::new(ws_stream, state);
    conn.run().await;

    tracing::info!("Connection closed from {:?}", addr);
}

/// State for a single connection
struct ConnectionState {
    ws: WebSocketStream<TcpStream>,
    state: Arc<DaemonState>,
    client_id: String,
}

impl ConnectionState {
    fn new(ws: WebSocketStream<TcpStream>, state: Arc<DaemonState>) -> Self {
        let mut client_id = uuid::Uuid::new_v4().simple().to_string();
        client_id.truncate(8);
        Self {
            ws,
            state,
            client_id: format!("cli_{}", client_id),
        }
    }

    async fn run(&mut self) {
        let shutdown = self.state.shutdown_token();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = self.ws.close(None).await;
                    break;
                }
                msg = self.ws.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = self.handle_message(&text).await {
                                tracing::error!("Failed to reply to {}: {}", self.client_id, e);
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Client {} requested close", self.client_id);
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = self.ws.send(Message::Pong(data)).await;
                        }
                        Some(Err(e)) => {
                            tracing::error!("WebSocket error: {}", e);
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
            }
        }
    }

    async fn handle_message(&mut self, text: &str) -> anyhow::Result<()> {
        let reply = match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => {
                tracing::debug!("{} -> {:?}", self.client_id, msg);
                self.state.handle(msg).await
            }
            Err(e) => ServerMessage::error(None, "bad_request", e.to_string()),
        };
        self.send(&reply).await
    }

    async fn send(&mut self, msg: &ServerMessage) -> anyhow::Result<()> {
        let json = serde_json::to_string(msg)?;
        self.ws.send(Message::Text(json)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::cache::IndexCache;
    use crate::daemon::serve;
    use crate::kind::EntityKind;
    use crate::source::MemorySource;
    use std::path::PathBuf;
    use tokio::net::TcpListener;
    use uuid::Uuid;

    async fn next_reply<S>(ws: &mut S) -> serde_json::Value
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_round_trip_over_websocket() {
        let id = Uuid::new_v4();
        let builder = IndexBuilder::new(Arc::new(
            MemorySource::new().with_entity(EntityKind::SecurityRequirement, id, "MFA"),
        ));
        let cache = IndexCache::new(Arc::new(builder.clone()));
        let state = Arc::new(DaemonState::new(
            Arc::new(cache),
            Some(builder),
            PathBuf::from("index.yaml"),
        ));
        let shutdown = state.shutdown_token();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, state));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();

        ws.send(Message::Text(r#"{"type":"ping"}"#.to_string())).await.unwrap();
        assert_eq!(next_reply(&mut ws).await["type"], "pong");

        ws.send(Message::Text("not json".to_string())).await.unwrap();
        let reply = next_reply(&mut ws).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["code"], "bad_request");
        assert!(reply["id"].is_null());

        let request = serde_json::json!({
            "type": "resolve",
            "id": 7,
            "kind": "securityRequirement",
            "externalId": id.to_string(),
        });
        ws.send(Message::Text(request.to_string())).await.unwrap();
        let reply = next_reply(&mut ws).await;
        assert_eq!(reply["type"], "resolved");
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["sequence"], 1);

        shutdown.cancel();
        server.await.unwrap();
    }
}
