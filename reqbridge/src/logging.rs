//! Tracing setup for hosts embedding the bridge.
//!
//! The bridge only emits `tracing` events. Hosts decide where they go; the
//! bundled host calls [`init`] with the level from its configuration file.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `default_level` is used (for example
/// the configured `log_level`). Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=reqbridge=trace reqbridge-host --project-dir .
/// ```
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests, re-activation) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

/// Check that `level` parses as a filter directive.
pub fn is_valid_level(level: &str) -> bool {
    EnvFilter::try_new(level).is_ok()
}
