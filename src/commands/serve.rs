//! Serve command handler - Run the resolution daemon in the foreground

use std::sync::Arc;

use crate::cli::ServeArgs;
use crate::commands::CommandContext;
use crate::daemon::{self, DaemonState};
use crate::error::{IndexError, Result};

/// Run the daemon until Ctrl-C
///
/// This creates a tokio runtime and blocks on the accept loop.
pub fn run_serve(args: &ServeArgs, ctx: &CommandContext) -> Result<String> {
    let addr = args
        .bind
        .clone()
        .unwrap_or_else(|| ctx.settings.daemon.bind_addr());
    let state = Arc::new(DaemonState::from_settings(
        &ctx.settings,
        args.from_file.clone(),
        args.db.clone(),
    )?);

    let runtime = tokio::runtime::Runtime::new().map_err(|e| IndexError::Config {
        message: format!("Failed to create tokio runtime: {}", e),
    })?;
    runtime.block_on(daemon::run(&addr, state))?;

    Ok(String::new())
}
