//! Error types and exit codes for tf-index

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for index build, persistence and cache operations
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Entity source unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("Malformed index document: {message}")]
    MalformedDocument { message: String },

    #[error("No entry for kind='{kind}' externalId='{external_id}'")]
    NotFound { kind: String, external_id: Uuid },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Persistence failure at {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Convert error to a process exit code:
    /// - 1: IO / persistence failure
    /// - 2: Invalid argument or configuration
    /// - 3: Malformed index document
    /// - 4: Entity source unavailable
    /// - 5: Not found
    /// - 130: Cancelled
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// Raw status byte behind [`exit_code`](Self::exit_code)
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Io(_) | Self::Persistence { .. } => 1,
            Self::InvalidArgument { .. } | Self::Config { .. } => 2,
            Self::MalformedDocument { .. } => 3,
            Self::SourceUnavailable { .. } => 4,
            Self::NotFound { .. } => 5,
            Self::Cancelled => 130,
        }
    }

    /// Short machine-readable code used by the daemon protocol
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::MalformedDocument { .. } => "malformed_document",
            Self::NotFound { .. } => "not_found",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Persistence { .. } | Self::Io(_) => "persistence_failure",
            Self::Cancelled => "cancelled",
            Self::Config { .. } => "config_error",
        }
    }

    pub(crate) fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for IndexError {
    fn from(e: rusqlite::Error) -> Self {
        Self::source_unavailable(e.to_string())
    }
}

/// Result type alias for tf-index operations
pub type Result<T> = std::result::Result<T, IndexError>;
