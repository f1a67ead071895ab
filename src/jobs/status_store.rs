//! JobStatusStore: upsert-only keyed store of `JobStatusRecord`, with an
//! in-memory implementation and a durable sqlx-backed implementation sharing
//! the same contract.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::Result;
use super::model::{Job, JobAttempt, JobId, JobStatusRecord, Status};

/// Internal query page size cap; external HTTP callers are clamped further
/// (to 100) at the routing layer.
pub const MAX_LIST_PAGE_SIZE: usize = 1000;
/// Default/external page size cap.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 100;

/// Optional filter criteria for `list`.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<Status>,
    pub job_type: Option<String>,
    pub source: Option<String>,
}

/// Per-type (or overall) aggregate counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTypeMetrics {
    pub total_jobs: u64,
    pub queue_depth: u64,
    pub processing_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub cancelled_count: u64,
    pub dead_letter_count: u64,
    pub average_processing_duration_ms: Option<f64>,
    pub average_queue_wait_time_ms: Option<f64>,
    pub failure_rate: f64,
}

/// Aggregated metrics over the full status record set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetrics {
    #[serde(flatten)]
    pub overall: JobTypeMetrics,
    pub by_type: HashMap<String, JobTypeMetrics>,
}

/// Contract shared by the in-memory and durable status store implementations.
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    /// Replace the record for `record.job_id`. Callers (the processor) are
    /// responsible for reading, appending attempts, and producing a
    /// fully-populated record before calling `set`.
    async fn set(&self, record: JobStatusRecord) -> Result<()>;

    async fn get(&self, job_id: JobId) -> Result<Option<JobStatusRecord>>;

    async fn delete(&self, job_id: JobId) -> Result<()>;

    async fn list(&self, filter: JobFilter, skip: usize, take: usize) -> Result<Vec<JobStatusRecord>>;

    async fn compute_metrics(&self) -> Result<JobMetrics>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-memory implementation
// ═══════════════════════════════════════════════════════════════════════════════

/// Concurrent in-memory status store. Readers always see a fully-written
/// record — `dashmap` entries are replaced wholesale, never mutated in place.
#[derive(Default)]
pub struct InMemoryJobStatusStore {
    records: DashMap<JobId, JobStatusRecord>,
}

impl InMemoryJobStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStatusStore for InMemoryJobStatusStore {
    async fn set(&self, record: JobStatusRecord) -> Result<()> {
        self.records.insert(record.job_id, record);
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Option<JobStatusRecord>> {
        Ok(self.records.get(&job_id).map(|r| r.clone()))
    }

    async fn delete(&self, job_id: JobId) -> Result<()> {
        self.records.remove(&job_id);
        Ok(())
    }

    async fn list(&self, filter: JobFilter, skip: usize, take: usize) -> Result<Vec<JobStatusRecord>> {
        let take = take.min(MAX_LIST_PAGE_SIZE);
        let mut matched: Vec<JobStatusRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.job_type.as_deref().is_none_or(|t| r.job_type == t))
            .filter(|r| filter.source.as_deref().is_none_or(|s| r.source == s))
            .collect();
        matched.sort_by_key(|r| r.created_at);
        Ok(matched.into_iter().skip(skip).take(take).collect())
    }

    async fn compute_metrics(&self) -> Result<JobMetrics> {
        let records: Vec<JobStatusRecord> = self.records.iter().map(|e| e.value().clone()).collect();
        Ok(aggregate_metrics(&records))
    }
}

fn aggregate_metrics(records: &[JobStatusRecord]) -> JobMetrics {
    let mut overall = JobTypeMetrics::default();
    let mut by_type: HashMap<String, JobTypeMetrics> = HashMap::new();
    let mut proc_durations: Vec<i64> = Vec::new();
    let mut wait_times: Vec<i64> = Vec::new();
    let mut per_type_durations: HashMap<String, Vec<i64>> = HashMap::new();
    let mut per_type_waits: HashMap<String, Vec<i64>> = HashMap::new();

    for record in records {
        overall.total_jobs += 1;
        let entry = by_type.entry(record.job_type.clone()).or_default();
        entry.total_jobs += 1;

        match record.status {
            Status::Queued => {
                overall.queue_depth += 1;
                entry.queue_depth += 1;
            }
            Status::Processing | Status::Retried => {
                overall.processing_count += 1;
                entry.processing_count += 1;
            }
            Status::Completed => {
                overall.completed_count += 1;
                entry.completed_count += 1;
            }
            Status::Failed => {
                overall.failed_count += 1;
                entry.failed_count += 1;
            }
            Status::Cancelled => {
                overall.cancelled_count += 1;
                entry.cancelled_count += 1;
            }
            Status::DeadLetter => {
                overall.dead_letter_count += 1;
                entry.dead_letter_count += 1;
            }
        }

        if let Some(d) = record.processing_duration_ms {
            proc_durations.push(d);
            per_type_durations.entry(record.job_type.clone()).or_default().push(d);
        }
        if let Some(w) = record.queue_wait_time_ms {
            wait_times.push(w);
            per_type_waits.entry(record.job_type.clone()).or_default().push(w);
        }
    }

    overall.average_processing_duration_ms = average(&proc_durations);
    overall.average_queue_wait_time_ms = average(&wait_times);
    overall.failure_rate = overall.failed_count as f64 / (overall.total_jobs.max(1) as f64);

    for (job_type, metrics) in by_type.iter_mut() {
        metrics.average_processing_duration_ms =
            average(per_type_durations.get(job_type).map(Vec::as_slice).unwrap_or_default());
        metrics.average_queue_wait_time_ms =
            average(per_type_waits.get(job_type).map(Vec::as_slice).unwrap_or_default());
        metrics.failure_rate = metrics.failed_count as f64 / (metrics.total_jobs.max(1) as f64);
    }

    JobMetrics { overall, by_type }
}

fn average(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Durable (sqlx/Postgres) implementation
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(sqlx::FromRow)]
struct JobStatusRow {
    job_id: uuid::Uuid,
    job_type: String,
    status: String,
    created_at: chrono::DateTime<Utc>,
    started_at: Option<chrono::DateTime<Utc>>,
    completed_at: Option<chrono::DateTime<Utc>>,
    retry_count: i32,
    max_retries: i32,
    last_retry_at: Option<chrono::DateTime<Utc>>,
    processing_duration_ms: Option<i64>,
    queue_wait_time_ms: Option<i64>,
    error_message: Option<String>,
    result_data: Option<serde_json::Value>,
    idempotency_key: Option<String>,
    attempts: serde_json::Value,
    correlation_id: Option<String>,
    source: String,
    parent_job_id: Option<String>,
    metadata: serde_json::Value,
}

impl JobStatusRow {
    fn into_record(self) -> Result<JobStatusRecord> {
        Ok(JobStatusRecord {
            job_id: JobId::from_uuid(self.job_id),
            job_type: self.job_type,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            retry_count: self.retry_count.max(0) as u32,
            max_retries: self.max_retries.max(0) as u32,
            last_retry_at: self.last_retry_at,
            processing_duration_ms: self.processing_duration_ms,
            queue_wait_time_ms: self.queue_wait_time_ms,
            error_message: self.error_message,
            result_data: self.result_data,
            idempotency_key: self.idempotency_key,
            attempts: serde_json::from_value(self.attempts).unwrap_or_default(),
            correlation_id: self.correlation_id,
            source: self.source,
            parent_job_id: self.parent_job_id,
            metadata: serde_json::from_value(self.metadata).unwrap_or_default(),
        })
    }
}

fn status_str(status: Status) -> &'static str {
    match status {
        Status::Queued => "queued",
        Status::Processing => "processing",
        Status::Completed => "completed",
        Status::Cancelled => "cancelled",
        Status::Failed => "failed",
        Status::Retried => "retried",
        Status::DeadLetter => "dead_letter",
    }
}

fn parse_status(s: &str) -> Result<Status> {
    Ok(match s {
        "queued" => Status::Queued,
        "processing" => Status::Processing,
        "completed" => Status::Completed,
        "cancelled" => Status::Cancelled,
        "failed" => Status::Failed,
        "retried" => Status::Retried,
        "dead_letter" => Status::DeadLetter,
        other => {
            return Err(crate::error::RelayError::storage_fault(format!(
                "unrecognized job status in storage: {other}"
            )))
        }
    })
}

/// Durable status store backed by the `job_status` table (see
/// `migrations/`). Shares the same contract as the in-memory store; `list`
/// is paginated the same way but executes the filter server-side.
pub struct PostgresJobStatusStore {
    pool: PgPool,
}

impl PostgresJobStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStatusStore for PostgresJobStatusStore {
    async fn set(&self, record: JobStatusRecord) -> Result<()> {
        let attempts = serde_json::to_value(&record.attempts).unwrap_or(serde_json::Value::Null);
        let metadata = serde_json::to_value(&record.metadata).unwrap_or(serde_json::Value::Null);

        sqlx::query(
            r#"
            INSERT INTO job_status (
                job_id, job_type, status, created_at, started_at, completed_at,
                retry_count, max_retries, last_retry_at, processing_duration_ms,
                queue_wait_time_ms, error_message, result_data, idempotency_key,
                attempts, correlation_id, source, parent_job_id, metadata
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
            ON CONFLICT (job_id) DO UPDATE SET
                status = EXCLUDED.status,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                retry_count = EXCLUDED.retry_count,
                max_retries = EXCLUDED.max_retries,
                last_retry_at = EXCLUDED.last_retry_at,
                processing_duration_ms = EXCLUDED.processing_duration_ms,
                queue_wait_time_ms = EXCLUDED.queue_wait_time_ms,
                error_message = EXCLUDED.error_message,
                result_data = EXCLUDED.result_data,
                attempts = EXCLUDED.attempts,
                metadata = EXCLUDED.metadata
            "#,
        )
        .bind(record.job_id.0)
        .bind(&record.job_type)
        .bind(status_str(record.status))
        .bind(record.created_at)
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(record.retry_count as i32)
        .bind(record.max_retries as i32)
        .bind(record.last_retry_at)
        .bind(record.processing_duration_ms)
        .bind(record.queue_wait_time_ms)
        .bind(&record.error_message)
        .bind(&record.result_data)
        .bind(&record.idempotency_key)
        .bind(attempts)
        .bind(&record.correlation_id)
        .bind(&record.source)
        .bind(&record.parent_job_id)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| crate::error::RelayError::storage_fault(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Option<JobStatusRecord>> {
        let row = sqlx::query_as::<_, JobStatusRow>("SELECT * FROM job_status WHERE job_id = $1")
            .bind(job_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| crate::error::RelayError::storage_fault(e.to_string()))?;

        row.map(JobStatusRow::into_record).transpose()
    }

    async fn delete(&self, job_id: JobId) -> Result<()> {
        sqlx::query("DELETE FROM job_status WHERE job_id = $1")
            .bind(job_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| crate::error::RelayError::storage_fault(e.to_string()))?;
        Ok(())
    }

    async fn list(&self, filter: JobFilter, skip: usize, take: usize) -> Result<Vec<JobStatusRecord>> {
        let take = take.min(MAX_LIST_PAGE_SIZE) as i64;
        let skip = skip as i64;

        let rows = sqlx::query_as::<_, JobStatusRow>(
            r#"
            SELECT * FROM job_status
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR job_type = $2)
              AND ($3::text IS NULL OR source = $3)
            ORDER BY created_at ASC
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(filter.status.map(status_str))
        .bind(filter.job_type)
        .bind(filter.source)
        .bind(skip)
        .bind(take)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| crate::error::RelayError::storage_fault(e.to_string()))?;

        rows.into_iter().map(JobStatusRow::into_record).collect()
    }

    async fn compute_metrics(&self) -> Result<JobMetrics> {
        let rows = sqlx::query_as::<_, JobStatusRow>("SELECT * FROM job_status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| crate::error::RelayError::storage_fault(e.to_string()))?;

        let records: Vec<JobStatusRecord> = rows
            .into_iter()
            .map(JobStatusRow::into_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(aggregate_metrics(&records))
    }
}

/// Builds a `Queued` attempt-free record from `job`, used by the
/// dispatcher when a job is accepted.
pub fn initial_record(job: &Job) -> JobStatusRecord {
    JobStatusRecord::queued(job)
}

/// Appends an attempt to a record in place, keeping attempt numbers
/// contiguous (§3 invariant: `attempts[i].attemptNumber == i + 1`).
pub fn append_attempt(record: &mut JobStatusRecord, attempt: JobAttempt) {
    debug_assert_eq!(attempt.attempt_number as usize, record.attempts.len() + 1);
    record.attempts.push(attempt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_record(job_type: &str, status: Status) -> JobStatusRecord {
        JobStatusRecord {
            job_id: JobId::new(),
            job_type: job_type.to_string(),
            status,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now() + Duration::milliseconds(50)),
            retry_count: 0,
            max_retries: 3,
            last_retry_at: None,
            processing_duration_ms: Some(50),
            queue_wait_time_ms: Some(10),
            error_message: None,
            result_data: None,
            idempotency_key: None,
            attempts: Vec::new(),
            correlation_id: None,
            source: "test".to_string(),
            parent_job_id: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn set_is_idempotent_per_job_id() {
        let store = InMemoryJobStatusStore::new();
        let mut record = sample_record("GeneratePlan", Status::Queued);
        let id = record.job_id;
        store.set(record.clone()).await.unwrap();
        record.status = Status::Processing;
        store.set(record).await.unwrap();

        let fetched = store.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.status, Status::Processing);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_type() {
        let store = InMemoryJobStatusStore::new();
        store.set(sample_record("A", Status::Completed)).await.unwrap();
        store.set(sample_record("B", Status::DeadLetter)).await.unwrap();
        store.set(sample_record("A", Status::DeadLetter)).await.unwrap();

        let filter = JobFilter { status: Some(Status::DeadLetter), job_type: None, source: None };
        let results = store.list(filter, 0, 100).await.unwrap();
        assert_eq!(results.len(), 2);

        let filter = JobFilter { status: None, job_type: Some("A".to_string()), source: None };
        let results = store.list(filter, 0, 100).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn list_clamps_take_to_internal_cap() {
        let store = InMemoryJobStatusStore::new();
        for _ in 0..5 {
            store.set(sample_record("A", Status::Completed)).await.unwrap();
        }
        let results = store.list(JobFilter::default(), 0, 10_000).await.unwrap();
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn compute_metrics_aggregates_counts_and_failure_rate() {
        let store = InMemoryJobStatusStore::new();
        store.set(sample_record("A", Status::Completed)).await.unwrap();
        store.set(sample_record("A", Status::Failed)).await.unwrap();
        store.set(sample_record("A", Status::Failed)).await.unwrap();

        let metrics = store.compute_metrics().await.unwrap();
        assert_eq!(metrics.overall.total_jobs, 3);
        assert_eq!(metrics.overall.failed_count, 2);
        assert!((metrics.overall.failure_rate - (2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(metrics.by_type.get("A").unwrap().total_jobs, 3);
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = InMemoryJobStatusStore::new();
        let record = sample_record("A", Status::Completed);
        let id = record.job_id;
        store.set(record).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
    }
}
