//! Command modules for the tf-index CLI
//!
//! Each command module implements a single top-level command:
//! - `build` - Build the index and print it
//! - `export` - Build the index and write it to the index file
//! - `resolve` - Resolve one `(kind, externalId)` pair
//! - `config` - Show or edit `tf-index.toml`
//! - `serve` - Run the WebSocket daemon in the foreground
//!
//! All command handlers take their respective `Args` struct from `cli.rs`
//! and a shared `CommandContext`, and return the text to print on stdout.

pub mod build;
pub mod config;
pub mod export;
pub mod resolve;
pub mod serve;

pub use build::run_build;
pub use config::run_config;
pub use export::run_export;
pub use resolve::run_resolve;
pub use serve::run_serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::builder::IndexBuilder;
use crate::cli::OutputFormat;
use crate::config::{Settings, CONFIG_FILE};
use crate::error::{IndexError, Result};
use crate::source::SqliteSource;

/// Shared context passed to all command handlers
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Output format (text or json)
    pub format: OutputFormat,
    /// Show verbose output
    pub verbose: bool,
    /// Where settings were loaded from; `config set` writes back here
    pub config_path: PathBuf,
    /// Loaded settings with environment overrides applied
    pub settings: Settings,
    /// Cancellation for long-running builds
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Load settings and build the context from CLI flags
    pub fn from_cli(config: Option<PathBuf>, format: OutputFormat, verbose: bool) -> Result<Self> {
        let config_path = config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let settings = Settings::load_from(&config_path)?.with_env_overrides();
        Ok(Self {
            format,
            verbose,
            config_path,
            settings,
            cancel: CancellationToken::new(),
        })
    }

    /// Context over explicit settings (tests, embedding callers)
    pub fn with_settings(settings: Settings, format: OutputFormat) -> Self {
        Self {
            format,
            verbose: false,
            config_path: PathBuf::from(CONFIG_FILE),
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel [`cancel`](Self::cancel) on the first Ctrl-C.
    ///
    /// The signal is awaited on a dedicated thread so synchronous builds
    /// observe it between rows.
    pub fn cancel_on_interrupt(&self) -> Result<()> {
        let cancel = self.cancel.clone();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        std::thread::Builder::new()
            .name("tf-index-interrupt".to_string())
            .spawn(move || {
                runtime.block_on(async {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::warn!("Interrupted, cancelling");
                        cancel.cancel();
                    }
                })
            })?;
        Ok(())
    }

    /// Database path: the command's `--db` flag wins over settings
    pub fn database_path<'a>(&'a self, db: Option<&'a Path>) -> &'a Path {
        db.unwrap_or(&self.settings.database.path)
    }

    /// Builder over the configured SQLite database
    pub fn open_builder(&self, db: Option<&Path>) -> Result<IndexBuilder> {
        let path = self.database_path(db);
        let source = SqliteSource::open(path)?.with_page_size(self.settings.database.page_size);
        Ok(IndexBuilder::new(Arc::new(source)))
    }
}

/// Render a report as pretty JSON or with the given text renderer
pub(crate) fn render<T: Serialize>(
    ctx: &CommandContext,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<String> {
    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).map_err(|e| {
                IndexError::invalid_argument(format!("JSON serialization failed: {}", e))
            })?;
            Ok(format!("{}\n", json))
        }
        OutputFormat::Text => Ok(text(value)),
    }
}
