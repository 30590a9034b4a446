//! Console logging for the command-line tool.
//!
//! Filtering follows `RUST_LOG`, e.g. `RUST_LOG=tabula::load=debug`.
//! Without it only warnings are shown, or debug events with `--verbose`.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber, writing to stderr
pub fn init(verbose: bool) {
    let default = if verbose { "tabula=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    // Ignored if a subscriber is already set
    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}
