//! Health check HTTP routes

use super::{HealthService, LivenessResponse, ReadinessResponse};
use crate::jobs::{JobQueue, JobStatusStore};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared health service state
pub type SharedHealthService = Arc<RwLock<HealthService>>;

/// State for `/health/detailed`: the generic health service plus direct
/// access to the queue and status store, needed to fill in the
/// job-orchestration metrics block the external contract requires.
#[derive(Clone)]
pub struct DetailedHealthState {
    pub health: SharedHealthService,
    pub queue: Arc<JobQueue>,
    pub status_store: Arc<dyn JobStatusStore>,
}

/// Component keys are literal (`database`, `job_queue`, `job_processing`),
/// matching the external contract as written.
#[derive(Debug, Serialize)]
pub struct DetailedHealthComponents {
    pub database: super::ComponentHealth,
    pub job_queue: super::ComponentHealth,
    pub job_processing: super::ComponentHealth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthMetrics {
    pub total_jobs: u64,
    pub queue_depth: u64,
    pub processing_count: u64,
    pub failure_rate: f64,
    pub average_processing_duration_ms: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: super::HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub components: DetailedHealthComponents,
    pub metrics: DetailedHealthMetrics,
}

/// GET /health - Basic health check
pub async fn health_check(
    State(service): State<SharedHealthService>,
) -> impl IntoResponse {
    let service = service.read().await;
    let report = service.check_health().await;
    let status = if report.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// GET /health/ready - Readiness probe for Kubernetes
pub async fn readiness_check(
    State(service): State<SharedHealthService>,
) -> impl IntoResponse {
    let service = service.read().await;
    let report = service.check_health().await;
    let response = ReadinessResponse::from_health_report(&report);

    let status = if response.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// GET /health/live - Liveness probe for Kubernetes
pub async fn liveness_check() -> impl IntoResponse {
    let response = LivenessResponse::alive();
    (StatusCode::OK, Json(response))
}

/// GET /health/detailed - component health plus job-orchestration metrics,
/// per the external health contract.
pub async fn detailed_health(
    State(state): State<DetailedHealthState>,
) -> impl IntoResponse {
    let service = state.health.read().await;
    let report = service.check_health().await;
    drop(service);

    let find = |name: &str| {
        report
            .components
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .unwrap_or_else(|| super::ComponentHealth::unhealthy(name).with_message("not checked"))
    };

    let metrics = state.status_store.compute_metrics().await.unwrap_or_default();
    let queue_depth = state.queue.count().await as u64;

    let response = DetailedHealthResponse {
        status: report.status,
        timestamp: report.timestamp,
        components: DetailedHealthComponents {
            database: find("database"),
            job_queue: find("job_queue"),
            job_processing: find("job_processing"),
        },
        metrics: DetailedHealthMetrics {
            total_jobs: metrics.overall.total_jobs,
            queue_depth,
            processing_count: metrics.overall.processing_count,
            failure_rate: metrics.overall.failure_rate,
            average_processing_duration_ms: metrics.overall.average_processing_duration_ms,
        },
    };

    let status = if report.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
