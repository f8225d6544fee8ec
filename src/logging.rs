//! Logging initialization.
//!
//! Diagnostics go through `tracing` to stderr; stdout carries only the
//! command's report. Skips and fallbacks are logged at WARN, per-image
//! decisions at DEBUG.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global subscriber.
///
/// `verbose` raises the default level from WARN to DEBUG. `RUST_LOG`, when
/// set, overrides both.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}
