//! Configuration management.
//!
//! Layered the way the rest of the stack expects: environment variables
//! (`RELAY__SECTION__FIELD`, double underscore separator) over an optional
//! file over built-in defaults. See `retry_policy`/`jobs`/`audit_log` for the
//! external option surface.

use serde::Deserialize;

use crate::jobs::model::BackoffStrategy;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Background job processing configuration
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Audit log retention configuration
    #[serde(default)]
    pub audit_log: AuditLogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

/// `retryPolicy.*` — retry/backoff behavior for the background job processor.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryPolicyConfig {
    #[serde(default = "default_retry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_backoff_strategy")]
    pub backoff_strategy: BackoffStrategy,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_min_jitter_factor")]
    pub min_jitter_factor: f64,

    #[serde(default = "default_max_jitter_factor")]
    pub max_jitter_factor: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            enabled: default_retry_enabled(),
            backoff_strategy: default_backoff_strategy(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            min_jitter_factor: default_min_jitter_factor(),
            max_jitter_factor: default_max_jitter_factor(),
        }
    }
}

impl From<RetryPolicyConfig> for crate::jobs::model::RetryPolicy {
    fn from(c: RetryPolicyConfig) -> Self {
        Self {
            enabled: c.enabled,
            backoff_strategy: c.backoff_strategy,
            base_delay_ms: c.base_delay_ms,
            max_delay_ms: c.max_delay_ms,
            min_jitter_factor: c.min_jitter_factor,
            max_jitter_factor: c.max_jitter_factor,
        }
    }
}

/// Background job processing configuration: concurrency, queueing,
/// shutdown, retry, and per-handler-type timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// 0 means unbounded.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    #[serde(default = "default_enable_prioritization")]
    pub enable_prioritization: bool,

    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,

    #[serde(default)]
    pub retry_policy: RetryPolicyConfig,

    /// 0 disables the timeout for that handler family.
    #[serde(default = "default_plan_timeout_seconds")]
    pub plan_timeout_seconds: u64,

    #[serde(default = "default_execution_timeout_seconds")]
    pub execution_timeout_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_queue_size: default_max_queue_size(),
            enable_prioritization: default_enable_prioritization(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
            retry_policy: RetryPolicyConfig::default(),
            plan_timeout_seconds: default_plan_timeout_seconds(),
            execution_timeout_seconds: default_execution_timeout_seconds(),
        }
    }
}

/// `auditLog.*` — retention sweep behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditLogConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self { retention_days: default_retention_days() }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

fn default_retry_enabled() -> bool { true }
fn default_backoff_strategy() -> BackoffStrategy { BackoffStrategy::Exponential }
fn default_max_retries() -> u32 { 3 }
fn default_base_delay_ms() -> u64 { 5_000 }
fn default_max_delay_ms() -> u64 { 300_000 }
fn default_min_jitter_factor() -> f64 { 0.0 }
fn default_max_jitter_factor() -> f64 { 0.2 }

fn default_max_concurrency() -> usize { 2 }
fn default_max_queue_size() -> usize { 100 }
fn default_enable_prioritization() -> bool { true }
fn default_shutdown_timeout_seconds() -> u64 { 30 }
fn default_plan_timeout_seconds() -> u64 { 0 }
fn default_execution_timeout_seconds() -> u64 { 0 }
fn default_retention_days() -> u32 { 90 }

const ENV_PREFIX: &str = "RELAY";

impl Config {
    /// Load configuration from environment and config files.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, overridable by environment.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}
