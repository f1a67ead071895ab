//! Health checker implementations.
//!
//! - **Database**: PostgreSQL connection and query health (only relevant
//!   when the durable status store is configured).
//! - **Job metrics**: queue depth and failure rate against the thresholds
//!   in the job processing design notes.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::check::{ComponentHealth, HealthStatus};
use crate::jobs::status_store::JobStatusStore;
use crate::jobs::JobQueue;

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for health checks.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Timeout for health checks
    pub timeout: Duration,
    /// Latency threshold for degraded status (milliseconds)
    pub latency_threshold_ms: u64,
    /// Enable detailed checks
    pub detailed: bool,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            latency_threshold_ms: 100,
            detailed: true,
        }
    }
}

impl HealthCheckConfig {
    /// Create a fast check configuration (shorter timeout).
    pub fn fast() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            latency_threshold_ms: 50,
            detailed: false,
        }
    }

    /// Create a thorough check configuration.
    pub fn thorough() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            latency_threshold_ms: 200,
            detailed: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Health Checker Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Trait for health checkers.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// The component name.
    fn name(&self) -> &str;

    /// Perform a health check.
    async fn check(&self) -> ComponentHealth;

    /// Perform a health check with configuration.
    async fn check_with_config(&self, config: &HealthCheckConfig) -> ComponentHealth {
        let start = Instant::now();
        let timeout = config.timeout;

        match tokio::time::timeout(timeout, self.check()).await {
            Ok(mut health) => {
                health.latency_ms = Some(start.elapsed().as_millis() as u64);
                health.check_latency_threshold(config.latency_threshold_ms);
                health
            }
            Err(_) => ComponentHealth::unhealthy(self.name())
                .with_error(format!("Health check timed out after {:?}", timeout))
                .with_latency(start.elapsed()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Database Health Checker
// ═══════════════════════════════════════════════════════════════════════════════

/// Health checker for PostgreSQL database. Only registered when the durable
/// status store is configured — unreachable maps to `Unhealthy`.
#[allow(dead_code)]
pub struct DatabaseHealthChecker {
    pool: PgPool,
    config: HealthCheckConfig,
}

impl DatabaseHealthChecker {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: HealthCheckConfig::default(),
        }
    }

    pub fn with_config(pool: PgPool, config: HealthCheckConfig) -> Self {
        Self { pool, config }
    }

    async fn check_pool(&self) -> Result<(), String> {
        let pool_size = self.pool.size();
        let idle = self.pool.num_idle();

        if pool_size == 0 {
            return Err("No connections in pool".to_string());
        }

        debug!(pool_size = pool_size, idle_connections = idle, "Database pool status");
        Ok(())
    }

    async fn check_query(&self) -> Result<(), String> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| format!("Query failed: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl HealthChecker for DatabaseHealthChecker {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> ComponentHealth {
        let start = Instant::now();

        if let Err(e) = self.check_pool().await {
            return ComponentHealth::unhealthy(self.name())
                .with_error(e)
                .with_latency(start.elapsed());
        }

        match self.check_query().await {
            Ok(()) => {
                let latency = start.elapsed();
                ComponentHealth::healthy(self.name())
                    .with_message("Connected to PostgreSQL")
                    .with_latency(latency)
                    .with_metadata("pool_size", self.pool.size())
                    .with_metadata("idle_connections", self.pool.num_idle())
            }
            Err(e) => {
                error!(error = %e, "Database health check failed");
                ComponentHealth::unhealthy(self.name())
                    .with_error(e)
                    .with_latency(start.elapsed())
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Queue Health Checker
// ═══════════════════════════════════════════════════════════════════════════════

/// Queue depth alone: `> 1000` → Degraded, else Healthy. Separate from
/// [`JobMetricsHealthChecker`] because the design notes treat queue depth
/// and failure rate as distinct health inputs reported under different
/// component names (`job_queue` vs `job_processing`).
pub struct JobQueueHealthChecker {
    queue: Arc<JobQueue>,
}

impl JobQueueHealthChecker {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl HealthChecker for JobQueueHealthChecker {
    fn name(&self) -> &str {
        "job_queue"
    }

    async fn check(&self) -> ComponentHealth {
        let start = Instant::now();
        let depth = self.queue.count().await;
        let status = if depth > 1000 { HealthStatus::Degraded } else { HealthStatus::Healthy };

        ComponentHealth::healthy(self.name())
            .with_status(status)
            .with_latency(start.elapsed())
            .with_metadata("queue_depth", depth)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Metrics Health Checker
// ═══════════════════════════════════════════════════════════════════════════════

/// Reflects queue depth and failure rate into a component status using the
/// exact thresholds from the job processing design notes:
/// queue depth > 1000 → Degraded; failure rate > 0.5 → Unhealthy;
/// failure rate > 0.2 or queue depth > 500 → Degraded; else Healthy.
pub struct JobMetricsHealthChecker {
    queue: Arc<JobQueue>,
    status_store: Arc<dyn JobStatusStore>,
}

impl JobMetricsHealthChecker {
    pub fn new(queue: Arc<JobQueue>, status_store: Arc<dyn JobStatusStore>) -> Self {
        Self { queue, status_store }
    }
}

#[async_trait]
impl HealthChecker for JobMetricsHealthChecker {
    fn name(&self) -> &str {
        "job_processing"
    }

    async fn check(&self) -> ComponentHealth {
        let start = Instant::now();
        let queue_depth = self.queue.count().await;

        let metrics = match self.status_store.compute_metrics().await {
            Ok(m) => m,
            Err(e) => {
                return ComponentHealth::unhealthy(self.name())
                    .with_error(format!("failed to compute job metrics: {e}"))
                    .with_latency(start.elapsed());
            }
        };

        let failure_rate = metrics.overall.failure_rate;

        let status = if failure_rate > 0.5 {
            HealthStatus::Unhealthy
        } else if failure_rate > 0.2 || queue_depth > 500 {
            HealthStatus::Degraded
        } else if queue_depth > 1000 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        ComponentHealth::healthy(self.name())
            .with_status(status)
            .with_latency(start.elapsed())
            .with_metadata("queue_depth", queue_depth)
            .with_metadata("failure_rate", failure_rate)
            .with_metadata("total_jobs", metrics.overall.total_jobs)
            .with_metadata("dead_letter_count", metrics.overall.dead_letter_count)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Composite Health Checker
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs multiple checks concurrently and folds them into one worst-wins
/// status (`HealthStatus::combine`).
pub struct CompositeHealthChecker {
    checkers: Vec<Arc<dyn HealthChecker>>,
    config: HealthCheckConfig,
}

impl CompositeHealthChecker {
    pub fn new() -> Self {
        Self {
            checkers: Vec::new(),
            config: HealthCheckConfig::default(),
        }
    }

    pub fn add_checker(mut self, checker: Arc<dyn HealthChecker>) -> Self {
        self.checkers.push(checker);
        self
    }

    pub fn with_config(mut self, config: HealthCheckConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn check_all(&self) -> Vec<ComponentHealth> {
        let futures: Vec<_> = self
            .checkers
            .iter()
            .map(|checker| {
                let checker = checker.clone();
                let config = self.config.clone();
                async move { checker.check_with_config(&config).await }
            })
            .collect();

        futures::future::join_all(futures).await
    }

    pub async fn check_combined(&self) -> HealthStatus {
        let results = self.check_all().await;
        results.into_iter().fold(HealthStatus::Healthy, |acc, r| acc.combine(r.status))
    }
}

impl Default for CompositeHealthChecker {
    fn default() -> Self {
        Self::new()
    }
}
