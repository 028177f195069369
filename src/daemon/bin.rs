//! tf-index Daemon Binary
//!
//! A WebSocket server that keeps the resolution cache warm and answers
//! refresh / resolve / export requests from any number of clients.
//!
//! # Usage
//!
//! ```bash
//! tf-index-daemon --port 9850
//! tf-index-daemon --config /etc/tf-index.toml --from-file /srv/tf/index.yaml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use tf_index::config::{Settings, CONFIG_FILE};
use tf_index::daemon::{self, DaemonState};
use tf_index::logging;

/// tf-index resolution daemon
#[derive(Parser, Debug)]
#[command(name = "tf-index-daemon")]
#[command(about = "Serves ThreatFramework sequential-id lookups over WebSocket")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Port to listen on (overrides daemon.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides daemon.host)
    #[arg(long)]
    host: Option<String>,

    /// Serve from a persisted index instead of the database
    #[arg(long, value_name = "FILE")]
    from_file: Option<PathBuf>,

    /// Entity database (overrides database.path)
    #[arg(long, value_name = "FILE", conflicts_with = "from_file")]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load_from(&args.config)?.with_env_overrides();
    if let Some(port) = args.port {
        settings.daemon.port = port;
    }
    if let Some(host) = args.host {
        settings.daemon.host = host;
    }

    logging::init(&settings.logging.level);
    tracing::info!("Starting tf-index daemon v{}", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(DaemonState::from_settings(
        &settings,
        args.from_file,
        args.db,
    )?);
    daemon::run(&settings.daemon.bind_addr(), state).await?;
    Ok(())
}
