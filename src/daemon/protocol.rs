//! Daemon protocol message types
//!
//! JSON text frames over WebSocket, tagged by `type`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Client-to-server message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Rebuild the resolution table
    Refresh { id: u64 },
    /// Look up a sequential id
    Resolve {
        id: u64,
        kind: String,
        #[serde(rename = "externalId")]
        external_id: String,
    },
    /// Build and write the index file; `path` defaults to the configured one
    Export {
        id: u64,
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// Report the current cache version
    Version { id: u64 },
    /// Ping to check connection
    Ping,
}

/// Server-to-client message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Refreshed {
        id: u64,
        version: u64,
    },
    Resolved {
        id: u64,
        kind: String,
        #[serde(rename = "externalId")]
        external_id: String,
        sequence: u64,
        version: u64,
    },
    /// Lookup miss; an expected outcome, not an error
    NotFound {
        id: u64,
        kind: String,
        #[serde(rename = "externalId")]
        external_id: String,
    },
    Exported {
        id: u64,
        file: PathBuf,
        count: usize,
    },
    Version {
        id: u64,
        version: u64,
    },
    /// Error response; `id` is absent when the request could not be parsed
    Error {
        id: Option<u64>,
        code: String,
        message: String,
    },
    /// Pong response
    Pong,
}

impl ServerMessage {
    pub fn error(id: Option<u64>, code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            id,
            code: code.to_string(),
            message: message.into(),
        }
    }
}
