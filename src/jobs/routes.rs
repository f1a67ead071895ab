//! HTTP read surface over the job status store: per-job status, filtered
//! listing, aggregate metrics, and the dead-letter view. Pure reads — no
//! route here ever mutates a `JobStatusRecord`.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use super::model::{JobId, Status};
use super::status_store::{JobFilter, JobStatusStore, DEFAULT_LIST_PAGE_SIZE};

#[derive(Clone)]
pub struct JobRoutesState {
    pub status_store: Arc<dyn JobStatusStore>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub source: Option<String>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

fn parse_status(raw: &str) -> Option<Status> {
    match raw.to_ascii_lowercase().as_str() {
        "queued" => Some(Status::Queued),
        "processing" => Some(Status::Processing),
        "completed" => Some(Status::Completed),
        "cancelled" => Some(Status::Cancelled),
        "failed" => Some(Status::Failed),
        "retried" => Some(Status::Retried),
        "dead_letter" | "deadletter" | "dead-letter" => Some(Status::DeadLetter),
        _ => None,
    }
}

/// Clamp an externally-requested page size to the store's internal cap. The
/// store clamps again on its own, but clamping here keeps the externally
/// visible default (`DEFAULT_LIST_PAGE_SIZE`) explicit regardless of what a
/// caller omits.
fn page_size(take: Option<usize>) -> usize {
    take.unwrap_or(DEFAULT_LIST_PAGE_SIZE)
}

/// GET /jobs/{jobId}/status
pub async fn job_status(
    State(state): State<JobRoutesState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let Ok(job_id) = JobId::from_str(&job_id) else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "invalid job id" })))
            .into_response();
    };

    match state.status_store.get(job_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "job not found" })))
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// GET /jobs?status=&type=&source=&skip=&take=
pub async fn list_jobs(
    State(state): State<JobRoutesState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let filter = JobFilter {
        status: query.status.as_deref().and_then(parse_status),
        job_type: query.job_type,
        source: query.source,
    };
    let skip = query.skip.unwrap_or(0);
    let take = page_size(query.take);

    match state.status_store.list(filter, skip, take).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// GET /jobs/metrics
pub async fn job_metrics(State(state): State<JobRoutesState>) -> impl IntoResponse {
    match state.status_store.compute_metrics().await {
        Ok(metrics) => (StatusCode::OK, Json(metrics)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

/// GET /jobs/dead-letter?skip=&take=
pub async fn dead_letter_jobs(
    State(state): State<JobRoutesState>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let filter = JobFilter { status: Some(Status::DeadLetter), job_type: None, source: None };
    let skip = query.skip.unwrap_or(0);
    let take = page_size(query.take);

    match state.status_store.list(filter, skip, take).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
