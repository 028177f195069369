//! tf-index resolution daemon
//!
//! Keeps one [`IndexCache`] warm and serves it to any number of WebSocket
//! clients. Cache work (refresh, first-use bootstrap, export) blocks, so it
//! runs on tokio's blocking pool; the connection tasks only shuttle frames.
//!
//! # Protocol
//!
//! ```json
//! // Client -> Server
//! {"type": "resolve", "id": 1, "kind": "component", "externalId": "6f1c2d9e-..."}
//! {"type": "refresh", "id": 2}
//! {"type": "export", "id": 3, "path": "out/index.yaml"}
//!
//! // Server -> Client
//! {"type": "resolved", "id": 1, "kind": "component", "externalId": "6f1c2d9e-...", "sequence": 4, "version": 1}
//! {"type": "refreshed", "id": 2, "version": 2}
//! {"type": "exported", "id": 3, "file": "out/index.yaml", "count": 412}
//! ```

pub mod connection;
pub mod protocol;

pub use connection::handle_connection;
pub use protocol::{ClientMessage, ServerMessage};

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::builder::IndexBuilder;
use crate::cache::IndexCache;
use crate::commands::export::export_index;
use crate::commands::resolve::parse_external_id;
use crate::config::Settings;
use crate::error::{IndexError, Result};
use crate::persist::IndexFile;
use crate::source::SqliteSource;

/// State shared by every connection
pub struct DaemonState {
    cache: Arc<IndexCache>,
    /// Absent when serving from a persisted index
    builder: Option<IndexBuilder>,
    index_path: PathBuf,
    shutdown: CancellationToken,
}

impl DaemonState {
    pub fn new(cache: Arc<IndexCache>, builder: Option<IndexBuilder>, index_path: PathBuf) -> Self {
        Self {
            cache,
            builder,
            index_path,
            shutdown: CancellationToken::new(),
        }
    }

    /// Serve from the entity database, or from a persisted index when
    /// `from_file` is given (an empty path means `index.path`)
    pub fn from_settings(
        settings: &Settings,
        from_file: Option<PathBuf>,
        db: Option<PathBuf>,
    ) -> Result<Self> {
        if let Some(path) = from_file {
            let path = if path.as_os_str().is_empty() {
                settings.index.path.clone()
            } else {
                path
            };
            let cache = IndexCache::new(Arc::new(IndexFile::new(&path)));
            return Ok(Self::new(Arc::new(cache), None, path));
        }

        let db = db.unwrap_or_else(|| settings.database.path.clone());
        let source = SqliteSource::open(&db)?.with_page_size(settings.database.page_size);
        let builder = IndexBuilder::new(Arc::new(source));
        let cache = IndexCache::new(Arc::new(builder.clone()));
        Ok(Self::new(
            Arc::new(cache),
            Some(builder),
            settings.index.path.clone(),
        ))
    }

    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    /// Token that stops the accept loop and open connections
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Produce the reply for one request
    pub async fn handle(self: &Arc<Self>, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::Ping => ServerMessage::Pong,

            ClientMessage::Version { id } => ServerMessage::Version {
                id,
                version: self.cache.current_version(),
            },

            ClientMessage::Refresh { id } => {
                let cache = Arc::clone(&self.cache);
                let cancel = self.shutdown.child_token();
                match blocking(move || cache.refresh(&cancel)).await {
                    Ok(version) => ServerMessage::Refreshed { id, version },
                    Err(e) => error_reply(id, &e),
                }
            }

            ClientMessage::Resolve {
                id,
                kind,
                external_id,
            } => {
                let uuid = match parse_external_id(&external_id) {
                    Ok(uuid) => uuid,
                    Err(e) => return error_reply(id, &e),
                };
                let cache = Arc::clone(&self.cache);
                let lookup_kind = kind.clone();
                match blocking(move || cache.lookup(&lookup_kind, uuid)).await {
                    Ok((Some(sequence), version)) => ServerMessage::Resolved {
                        id,
                        kind,
                        external_id,
                        sequence,
                        version,
                    },
                    Ok((None, _)) => ServerMessage::NotFound {
                        id,
                        kind,
                        external_id,
                    },
                    Err(e) => error_reply(id, &e),
                }
            }

            ClientMessage::Export { id, path } => {
                let Some(builder) = self.builder.clone() else {
                    return error_reply(
                        id,
                        &IndexError::invalid_argument("export requires an entity database"),
                    );
                };
                let target = path.unwrap_or_else(|| self.index_path.clone());
                let cancel = self.shutdown.child_token();
                match blocking(move || export_index(&builder, &target, &cancel)).await {
                    Ok(report) => ServerMessage::Exported {
                        id,
                        file: report.file,
                        count: report.count,
                    },
                    Err(e) => error_reply(id, &e),
                }
            }
        }
    }
}

/// Accept connections until the state's shutdown token is cancelled
pub async fn serve(listener: TcpListener, state: Arc<DaemonState>) {
    let shutdown = state.shutdown_token();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Daemon shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tracing::info!("Accepted connection from {}", addr);
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        handle_connection(stream, state).await;
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Bind `addr` and serve until Ctrl-C
pub async fn run(addr: &str, state: Arc<DaemonState>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("tf-index daemon listening on ws://{}", listener.local_addr()?);

    let shutdown = state.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    serve(listener, state).await;
    Ok(())
}

fn error_reply(id: u64, err: &IndexError) -> ServerMessage {
    if !matches!(err, IndexError::InvalidArgument { .. }) {
        tracing::warn!("Request {} failed: {}", id, err);
    }
    ServerMessage::error(Some(id), err.code(), err.to_string())
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| IndexError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}
