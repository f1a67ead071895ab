//! Prometheus Metrics for Request Durations, Connections, and Errors.
//!
//! This module provides comprehensive metrics collection with:
//!
//! - Request duration histograms with configurable buckets
//! - Active connections gauge for connection pool monitoring
//! - Error counters by type/code for observability
//! - Custom business metrics (tokens, costs, etc.)
//!
//! # Example
//!
//! ```rust,no_run
//! use relay_core::telemetry::metrics::{MetricsRegistry, RequestDurationHistogram, ErrorCounter};
//!
//! // Record request duration
//! RequestDurationHistogram::record("http", "POST", "/api/tasks", 200, 0.125);
//!
//! // Increment error counter
//! ErrorCounter::increment("validation", "invalid_input");
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global metrics registry.
static METRICS_REGISTRY: OnceLock<MetricsRegistry> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Prometheus exporter endpoint (e.g., "0.0.0.0:9090")
    #[serde(default = "default_metrics_endpoint")]
    pub endpoint: String,

    /// Histogram buckets for request durations (in seconds)
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,

    /// Global labels to add to all metrics
    #[serde(default)]
    pub global_labels: HashMap<String, String>,

    /// Whether to enable default process metrics
    #[serde(default = "default_enable_process_metrics")]
    pub enable_process_metrics: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            endpoint: default_metrics_endpoint(),
            duration_buckets: default_duration_buckets(),
            global_labels: HashMap::new(),
            enable_process_metrics: default_enable_process_metrics(),
        }
    }
}

// Default value functions
fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_endpoint() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_duration_buckets() -> Vec<f64> {
    vec![
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

fn default_enable_process_metrics() -> bool {
    true
}

/// Central metrics registry for managing all metrics.
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// Get the global metrics registry.
    pub fn global() -> &'static MetricsRegistry {
        METRICS_REGISTRY.get_or_init(|| MetricsRegistry {
            prometheus_handle: None,
        })
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Prometheus exporter for serving metrics via HTTP.
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Render metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize the metrics subsystem.
///
/// # Arguments
///
/// * `config` - Metrics configuration
/// * `service_name` - Name of the service for identification
///
/// # Errors
///
/// Returns an error if metrics initialization fails.
pub fn init_metrics(config: &MetricsConfig, service_name: &str) -> anyhow::Result<MetricsRegistry> {
    if !config.enabled {
        return Ok(MetricsRegistry {
            prometheus_handle: None,
        });
    }

    // Build the Prometheus recorder
    let mut builder = PrometheusBuilder::new();

    // Add global labels
    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    // Set custom buckets for histograms
    builder = builder.set_buckets(&config.duration_buckets)?;

    // Install the recorder and get the handle
    let handle = builder.install_recorder()?;

    // Register metric descriptions
    register_metric_descriptions();

    // Store the registry globally
    let registry = MetricsRegistry {
        prometheus_handle: Some(handle),
    };

    let _ = METRICS_REGISTRY.set(MetricsRegistry {
        prometheus_handle: None, // We'll use the one in the returned registry
    });

    tracing::info!(
        service_name = %service_name,
        endpoint = %config.endpoint,
        "Metrics initialized"
    );

    Ok(registry)
}

/// Register all metric descriptions.
fn register_metric_descriptions() {
    // Request metrics
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_counter!("http_request_errors_total", "Total number of HTTP errors");

    // Connection metrics
    describe_gauge!(
        "active_connections",
        "Number of currently active connections"
    );
    describe_gauge!(
        "connection_pool_size",
        "Current size of the connection pool"
    );
    describe_gauge!(
        "connection_pool_available",
        "Available connections in the pool"
    );

    // Error metrics
    describe_counter!("errors_total", "Total number of errors by type");

    // Job metrics
    describe_counter!("relay_jobs_total", "Total number of jobs processed");
    describe_counter!(
        "relay_jobs_completed",
        "Total number of jobs completed successfully"
    );
    describe_counter!("relay_jobs_failed", "Total number of jobs that failed");
    describe_counter!("relay_jobs_dead_lettered", "Total number of jobs dead-lettered");
    describe_histogram!(
        "relay_job_duration_seconds",
        "Job execution duration in seconds"
    );

    // Queue metrics
    describe_gauge!("relay_queue_depth", "Number of jobs in the queue");
    describe_gauge!(
        "relay_worker_utilization",
        "Worker pool utilization (0-1)"
    );
}

/// Request duration histogram for HTTP requests.
pub struct RequestDurationHistogram;

impl RequestDurationHistogram {
    /// Record a request duration.
    pub fn record(
        protocol: &str,
        method: &str,
        path: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        histogram!(
            "http_request_duration_seconds",
            "protocol" => protocol.to_string(),
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status_code" => status_code.to_string(),
        )
        .record(duration_seconds);

        counter!(
            "http_requests_total",
            "protocol" => protocol.to_string(),
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status_code" => status_code.to_string(),
        )
        .increment(1);

        // Track errors separately
        if status_code >= 400 {
            counter!(
                "http_request_errors_total",
                "protocol" => protocol.to_string(),
                "method" => method.to_string(),
                "path" => path.to_string(),
                "status_code" => status_code.to_string(),
            )
            .increment(1);
        }
    }

    /// Start timing a request, returns a guard that records duration on drop.
    pub fn start(protocol: &str, method: &str, path: &str) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
            protocol: protocol.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            status_code: None,
        }
    }
}

/// Timer for measuring request durations.
pub struct RequestTimer {
    start: Instant,
    protocol: String,
    method: String,
    path: String,
    status_code: Option<u16>,
}

impl RequestTimer {
    /// Set the status code for the response.
    pub fn set_status(&mut self, status_code: u16) {
        self.status_code = Some(status_code);
    }

    /// Finish timing and record the duration.
    pub fn finish(self, status_code: u16) {
        let duration = self.start.elapsed().as_secs_f64();
        RequestDurationHistogram::record(
            &self.protocol,
            &self.method,
            &self.path,
            status_code,
            duration,
        );
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        if let Some(status_code) = self.status_code {
            let duration = self.start.elapsed().as_secs_f64();
            RequestDurationHistogram::record(
                &self.protocol,
                &self.method,
                &self.path,
                status_code,
                duration,
            );
        }
    }
}

/// Active connections gauge for monitoring connection pools.
pub struct ActiveConnectionsGauge;

impl ActiveConnectionsGauge {
    /// Set the number of active connections.
    pub fn set(pool_name: &str, count: u64) {
        gauge!("active_connections", "pool" => pool_name.to_string()).set(count as f64);
    }

    /// Increment the active connection count.
    pub fn increment(pool_name: &str) {
        gauge!("active_connections", "pool" => pool_name.to_string()).increment(1.0);
    }

    /// Decrement the active connection count.
    pub fn decrement(pool_name: &str) {
        gauge!("active_connections", "pool" => pool_name.to_string()).decrement(1.0);
    }

    /// Set the total pool size.
    pub fn set_pool_size(pool_name: &str, size: u64) {
        gauge!("connection_pool_size", "pool" => pool_name.to_string()).set(size as f64);
    }

    /// Set the available connections in the pool.
    pub fn set_available(pool_name: &str, available: u64) {
        gauge!("connection_pool_available", "pool" => pool_name.to_string()).set(available as f64);
    }
}

/// Error counter for tracking errors by type.
pub struct ErrorCounter;

impl ErrorCounter {
    /// Increment the error counter for a specific error type.
    pub fn increment(error_type: &str, error_code: &str) {
        counter!(
            "errors_total",
            "type" => error_type.to_string(),
            "code" => error_code.to_string(),
        )
        .increment(1);
    }

    /// Increment with additional context.
    pub fn increment_with_context(error_type: &str, error_code: &str, service: &str) {
        counter!(
            "errors_total",
            "type" => error_type.to_string(),
            "code" => error_code.to_string(),
            "service" => service.to_string(),
        )
        .increment(1);
    }
}

/// Job lifecycle metrics for the background job processor.
pub struct JobMetrics;

impl JobMetrics {
    /// Record a job completion.
    pub fn record_job_completed(job_id: &str, job_type: &str, duration_seconds: f64) {
        counter!("relay_jobs_total", "status" => "completed").increment(1);
        counter!("relay_jobs_completed").increment(1);
        histogram!("relay_job_duration_seconds", "job_type" => job_type.to_string())
            .record(duration_seconds);

        tracing::debug!(
            job_id = %job_id,
            job_type = %job_type,
            duration_seconds = %duration_seconds,
            "Job completed metrics recorded"
        );
    }

    /// Record a job failure.
    pub fn record_job_failed(job_id: &str, job_type: &str, dead_lettered: bool) {
        counter!("relay_jobs_total", "status" => "failed").increment(1);
        counter!("relay_jobs_failed", "job_type" => job_type.to_string()).increment(1);
        if dead_lettered {
            counter!("relay_jobs_dead_lettered", "job_type" => job_type.to_string()).increment(1);
        }

        tracing::debug!(
            job_id = %job_id,
            job_type = %job_type,
            dead_lettered = %dead_lettered,
            "Job failed metrics recorded"
        );
    }

    /// Set the current queue depth.
    pub fn set_queue_depth(depth: u64) {
        gauge!("relay_queue_depth").set(depth as f64);
    }

    /// Set worker utilization (0.0 to 1.0).
    pub fn set_worker_utilization(utilization: f64) {
        gauge!("relay_worker_utilization").set(utilization);
    }
}

/// Utility for tracking operation timing with automatic metric recording.
pub struct OperationTimer {
    start: Instant,
    operation_name: &'static str,
    labels: HashMap<String, String>,
}

impl OperationTimer {
    /// Start timing an operation.
    ///
    /// Note: The operation_name must be a static string since metrics names
    /// cannot be dynamically generated at runtime.
    pub fn start(operation_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation_name,
            labels: HashMap::new(),
        }
    }

    /// Add a label to the timer.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Get elapsed time without recording.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Finish and record to a histogram.
    ///
    /// Records to a generic "operation_duration_seconds" histogram with the
    /// operation name as a label.
    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();

        histogram!(
            "operation_duration_seconds",
            "operation" => self.operation_name,
        )
        .record(duration.as_secs_f64());

        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_defaults() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.endpoint, "0.0.0.0:9090");
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_request_timer() {
        let timer = RequestDurationHistogram::start("http", "GET", "/test");
        std::thread::sleep(std::time::Duration::from_millis(10));
        timer.finish(200);
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::start("test_operation").label("key", "value");

        std::thread::sleep(std::time::Duration::from_millis(10));
        let duration = timer.finish();

        assert!(duration.as_millis() >= 10);
    }

    #[test]
    fn test_job_metrics_record() {
        JobMetrics::record_job_completed("job-1", "GeneratePlan", 0.5);
        JobMetrics::record_job_failed("job-2", "GeneratePlan", true);
        JobMetrics::set_queue_depth(3);
        JobMetrics::set_worker_utilization(0.25);
    }
}
