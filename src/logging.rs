//! Logging setup for the etherquery binary

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used for status lines reported by the query client
pub const STATUS_TARGET: &str = "etherquery::status";

/// Initialize tracing with output to stderr
///
/// `RUST_LOG` takes precedence over `level` when it is set. An invalid
/// level falls back to `info`.
pub fn init(level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|e| {
            eprintln!("Invalid log level '{}': {}. Falling back to 'info'", level, e);
            EnvFilter::new("info")
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
}

/// Forwards a status line from the query client to the log
pub fn log_status(status: &str) {
    tracing::info!(target: STATUS_TARGET, "{}", status);
}
