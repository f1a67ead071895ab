//! Telemetry: logging and metrics infrastructure backing [`crate::observability`].
//!
//! - **Logging**: structured JSON/pretty logging with sensitive data redaction
//! - **Metrics**: Prometheus metrics for queue depth, job outcomes, and durations

pub mod logging;
pub mod metrics;

pub use logging::{
    init_logging, LogFormat, LoggingConfig, RedactionConfig, RedactionPattern,
    SensitiveFieldRedactor,
};
pub use metrics::{
    init_metrics, MetricsConfig, MetricsRegistry, PrometheusExporter,
    // Metric types
    ActiveConnectionsGauge, ErrorCounter, RequestDurationHistogram,
    // Job metrics
    JobMetrics,
};
