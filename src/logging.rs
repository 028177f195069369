//! Tracing subscriber setup shared by both binaries

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `RUST_LOG` plus `tf_index=<level>`.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// An unrecognized level falls back to `info`.
pub fn init(level: &str) {
    let mut filter = EnvFilter::from_default_env();
    if let Some(directive) = crate_directive(level) {
        filter = filter.add_directive(directive);
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn crate_directive(level: &str) -> Option<Directive> {
    let level: tracing::Level = level.trim().parse().unwrap_or(tracing::Level::INFO);
    format!("tf_index={}", level.to_string().to_lowercase())
        .parse()
        .ok()
}
