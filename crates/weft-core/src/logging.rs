//! Logging setup.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! the application's choice. With the `logging` feature, [`init`] installs a
//! `tracing-subscriber` fmt subscriber filtered by the `WEFT_LOG` variable
//! (same syntax as `RUST_LOG`, default `warn`).

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "WEFT_LOG";

/// Default filter when `WEFT_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Output format for [`init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per line (requires the `logging-json` feature;
    /// falls back to `Compact` otherwise).
    Json,
}

/// Install the global subscriber.
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "logging")]
pub fn init(format: LogFormat) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        #[cfg(feature = "logging-json")]
        LogFormat::Json => builder.json().try_init().is_ok(),
        _ => builder.compact().try_init().is_ok(),
    }
}

/// Without the `logging` feature there is nothing to install.
#[cfg(not(feature = "logging"))]
pub fn init(_format: LogFormat) -> bool {
    false
}
