//! Core data model: `Job`, `Status`, `JobStatusRecord`, `JobAttempt`, `RetryPolicy`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════════
// Job Identification
// ═══════════════════════════════════════════════════════════════════════════════

/// Unique identifier for a job instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle status of a job, as described in §3 of the job orchestration core:
///
/// ```text
/// Queued ──► Processing ──► Completed
///                     ├──► Cancelled
///                     ├──► Failed
///                     ├──► Retried ──► Queued
///                     └──► DeadLetter
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    Processing,
    Completed,
    Cancelled,
    Failed,
    /// Informational transient state recorded before a retry re-enqueue.
    Retried,
    DeadLetter,
}

impl Status {
    /// Terminal statuses release the dedup reservation and accept no further
    /// non-terminal `set` calls.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::DeadLetter
        )
    }

    /// "In flight" per the glossary: queued, processing, or retried.
    pub fn is_in_flight(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
            Self::Retried => write!(f, "retried"),
            Self::DeadLetter => write!(f, "dead_letter"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Backoff Strategy & Retry Policy
// ═══════════════════════════════════════════════════════════════════════════════

/// Backoff family used by the retry policy calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Constant,
    Linear,
    Exponential,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential
    }
}

/// Configuration for retry/backoff behavior, mirroring `retryPolicy.*` in the
/// external configuration surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub backoff_strategy: BackoffStrategy,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub min_jitter_factor: f64,
    pub max_jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            backoff_strategy: BackoffStrategy::Exponential,
            base_delay_ms: 5_000,
            max_delay_ms: 300_000,
            min_jitter_factor: 0.0,
            max_jitter_factor: 0.2,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job
// ═══════════════════════════════════════════════════════════════════════════════

/// A unit of deferrable work. Immutable except `retry_count` and
/// `cancellation_scope`, which are rebuilt fresh on every retry.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub payload: Vec<u8>,
    pub priority: i32,
    pub max_retries: u32,
    pub retry_count: u32,
    pub idempotency_key: Option<String>,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent enqueue (differs from `created_at` on
    /// a retry re-enqueue; used to compute `queue_wait_time_ms`).
    pub enqueued_at: DateTime<Utc>,
    /// The backoff delay computed and slept before this re-enqueue (0 for a
    /// first-attempt job). Surfaced back as `JobAttempt::delay_before_attempt_ms`
    /// — distinct from `queue_wait_time_ms`, which resets to ~0 on every retry
    /// re-enqueue and so can't stand in for the backoff itself.
    pub pending_retry_delay_ms: i64,
    /// Per-job cancellation, linked to the processor's shutdown scope.
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl Job {
    /// Build a fresh job for first-time dispatch.
    pub fn new(
        job_type: impl Into<String>,
        payload: Vec<u8>,
        parent_cancellation: &tokio_util::sync::CancellationToken,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload,
            priority: 0,
            max_retries: 3,
            retry_count: 0,
            idempotency_key: None,
            metadata: HashMap::new(),
            created_at: now,
            enqueued_at: now,
            pending_retry_delay_ms: 0,
            cancellation: parent_cancellation.child_token(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source(&self) -> &str {
        self.metadata.get("source").map(|s| s.as_str()).unwrap_or("unknown")
    }

    pub fn parent_job_id(&self) -> Option<&str> {
        self.metadata.get("parentJobId").map(|s| s.as_str())
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata.get("correlationId").map(|s| s.as_str())
    }

    /// Rebuild this job for a retry attempt: same `id`, `created_at` and
    /// `idempotency_key`; incremented `retry_count`; fresh cancellation scope
    /// and `enqueued_at`. `delay_ms` is the backoff delay just computed and
    /// slept by the caller, carried forward so the next attempt can report
    /// it as `delay_before_attempt_ms`.
    pub fn for_retry(&self, parent_cancellation: &tokio_util::sync::CancellationToken, delay_ms: i64) -> Self {
        Self {
            id: self.id,
            job_type: self.job_type.clone(),
            payload: self.payload.clone(),
            priority: self.priority,
            max_retries: self.max_retries,
            retry_count: self.retry_count + 1,
            idempotency_key: self.idempotency_key.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            enqueued_at: Utc::now(),
            pending_retry_delay_ms: delay_ms,
            cancellation: parent_cancellation.child_token(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JobAttempt
// ═══════════════════════════════════════════════════════════════════════════════

/// An append-only record of a single handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAttempt {
    /// 1-based attempt number.
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub succeeded: bool,
    pub error_message: Option<String>,
    pub exception_type: Option<String>,
    pub duration_ms: i64,
    /// Delay observed before this attempt (0 for the first attempt).
    pub delay_before_attempt_ms: i64,
    pub backoff_strategy: Option<BackoffStrategy>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// JobStatusRecord
// ═══════════════════════════════════════════════════════════════════════════════

/// Durable, mutable-through-explicit-transitions-only record owned by the
/// status store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRecord {
    pub job_id: JobId,
    pub job_type: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub processing_duration_ms: Option<i64>,
    pub queue_wait_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub result_data: Option<serde_json::Value>,
    pub idempotency_key: Option<String>,
    pub attempts: Vec<JobAttempt>,
    pub correlation_id: Option<String>,
    pub source: String,
    pub parent_job_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl JobStatusRecord {
    /// Build the initial `Queued` record for a freshly dispatched job.
    pub fn queued(job: &Job) -> Self {
        Self {
            job_id: job.id,
            job_type: job.job_type.clone(),
            status: Status::Queued,
            created_at: job.created_at,
            started_at: None,
            completed_at: None,
            retry_count: job.retry_count,
            max_retries: job.max_retries,
            last_retry_at: None,
            processing_duration_ms: None,
            queue_wait_time_ms: None,
            error_message: None,
            result_data: None,
            idempotency_key: job.idempotency_key.clone(),
            attempts: Vec::new(),
            correlation_id: job.correlation_id().map(str::to_string),
            source: job.source().to_string(),
            parent_job_id: job.parent_job_id().map(str::to_string),
            metadata: job.metadata.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Handler result sum type
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a single handler invocation. Handlers return this instead of
/// throwing; the worker never lets a handler fault escape as a panic into the
/// process (panics are caught and converted to a retryable failure).
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success { result_data: Option<serde_json::Value> },
    Failure { error_message: String, retryable: bool, error_type: Option<String> },
}

impl JobOutcome {
    pub fn success() -> Self {
        Self::Success { result_data: None }
    }

    pub fn success_with(result_data: serde_json::Value) -> Self {
        Self::Success { result_data: Some(result_data) }
    }

    pub fn retryable_failure(message: impl Into<String>) -> Self {
        Self::Failure {
            error_message: message.into(),
            retryable: true,
            error_type: None,
        }
    }

    pub fn permanent_failure(message: impl Into<String>) -> Self {
        Self::Failure {
            error_message: message.into(),
            retryable: false,
            error_type: None,
        }
    }
}
