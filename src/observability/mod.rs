//! Observability: structured logging and tracing bootstrap.
//!
//! Thin wrapper around [`crate::telemetry::logging`] that the binary calls once at
//! startup. Kept separate from `telemetry` so `main.rs` has a single obvious entry
//! point instead of reaching into the telemetry module's internals directly.

use crate::telemetry::logging::{init_logging, LogFormat, LoggingConfig};

/// Initialize the observability stack (structured logging with redaction).
pub fn init(_service_name: &str, log_level: &str, json_logging: bool) -> anyhow::Result<()> {
    let config = LoggingConfig {
        level: log_level.to_string(),
        format: if json_logging {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        ..LoggingConfig::default()
    };

    init_logging(&config, &std::env::var("RELAY_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()))
}

/// Shutdown the observability stack.
///
/// No-op today: the logging subscriber has nothing to flush once OTLP export is
/// out of the picture. Kept as a function so `main.rs` doesn't need to change if
/// that stops being true.
pub fn shutdown() {}
