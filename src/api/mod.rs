//! HTTP surface: health probes and the job-status read API.
//!
//! Everything here is a read — nothing in this layer mutates a job or its
//! status record. Event ingestion happens out of band, through
//! `ingress::IngressAdapter`, which the webhook-receiving caller owns.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::health::{self, DetailedHealthState, SharedHealthService};
use crate::jobs::routes as job_routes;
use crate::jobs::{JobQueue, JobRoutesState, JobStatusStore};

/// Everything `build_router` needs, assembled in `main`.
pub struct AppDeps {
    pub health: SharedHealthService,
    pub queue: Arc<JobQueue>,
    pub status_store: Arc<dyn JobStatusStore>,
}

/// Build the full HTTP router: health probes plus the job-status read
/// surface, under a shared `tower-http` middleware stack.
pub fn build_router(deps: AppDeps) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let detailed_state = DetailedHealthState {
        health: deps.health.clone(),
        queue: deps.queue.clone(),
        status_store: deps.status_store.clone(),
    };
    let job_state = JobRoutesState { status_store: deps.status_store.clone() };

    let health_basic = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .with_state(deps.health.clone());

    let health_detailed =
        Router::new().route("/health/detailed", get(health::detailed_health)).with_state(detailed_state);

    let jobs = Router::new()
        .route("/jobs/metrics", get(job_routes::job_metrics))
        .route("/jobs/dead-letter", get(job_routes::dead_letter_jobs))
        .route("/jobs/:job_id/status", get(job_routes::job_status))
        .route("/jobs", get(job_routes::list_jobs))
        .with_state(job_state);

    Router::new()
        .merge(health_basic)
        .merge(health_detailed)
        .merge(jobs)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Generic API response envelope, used by any handler that isn't a plain
/// resource payload.
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, error_code: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()), error_code: None }
    }

    pub fn from_relay_error(err: &crate::error::RelayError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.user_message().to_string()),
            error_code: Some(err.error_code().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let response: ApiResponse<()> = ApiResponse::error("test error");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error, Some("test error".to_string()));
    }
}
