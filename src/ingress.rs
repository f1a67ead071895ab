//! Event Ingress Adapter: turns a validated external event into a dispatched
//! job. Sits in front of the dedup/dispatch/queue pipeline; owns none of the
//! job lifecycle itself, only the translation from "webhook event" to "job,
//! reserved under its idempotency key, in the queue".

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditEvent, AuditEventType, AuditLogger, CorrelationContext};
use crate::error::{RelayError, Result};
use crate::jobs::{Job, JobDeduplicationService, JobDispatcher, JobId};

/// Minimal identity of the upstream unit of work a job is generated for,
/// e.g. a GitHub issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdentity {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl TaskIdentity {
    /// `{owner}/{repo}/issues/{number}` — stable external key.
    pub fn task_id(&self) -> String {
        format!("{}/{}/issues/{}", self.owner, self.repo, self.number)
    }
}

/// The upstream task store is an external collaborator: this crate only
/// needs an upsert-by-identity hook, never full task CRUD.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn upsert_task(&self, identity: &TaskIdentity, event_kind: &str) -> Result<()>;
}

/// Upsert-only `agent_tasks` access. No read path is needed here; status
/// polling goes through `JobStatusStore`, not the task table.
pub struct PostgresTaskRepository {
    pool: sqlx::PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn upsert_task(&self, identity: &TaskIdentity, event_kind: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_tasks (task_id, owner, repo, issue_number, last_event_kind, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (task_id) DO UPDATE SET
                last_event_kind = EXCLUDED.last_event_kind,
                updated_at = now()
            "#,
        )
        .bind(identity.task_id())
        .bind(&identity.owner)
        .bind(&identity.repo)
        .bind(identity.number as i64)
        .bind(event_kind)
        .execute(&self.pool)
        .await
        .map_err(|e| RelayError::storage_fault(e.to_string()))?;

        Ok(())
    }
}

/// A validated inbound event, already past signature verification by the
/// caller.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub identity: TaskIdentity,
    /// e.g. "issue_comment", "issues.opened" — drives `job_type`.
    pub kind: String,
    pub payload: Vec<u8>,
}

/// Event ingress adapter (C9): receive → correlate → identify → persist task
/// → build job → dedup-reserve → dispatch.
pub struct IngressAdapter {
    dispatcher: Arc<JobDispatcher>,
    dedup: Arc<JobDeduplicationService>,
    audit: Arc<AuditLogger>,
    tasks: Arc<dyn TaskRepository>,
    shutdown: CancellationToken,
    /// Configured `retryPolicy.maxRetries`, applied to every dispatched job.
    max_retries: u32,
}

impl IngressAdapter {
    pub fn new(
        dispatcher: Arc<JobDispatcher>,
        dedup: Arc<JobDeduplicationService>,
        audit: Arc<AuditLogger>,
        tasks: Arc<dyn TaskRepository>,
        shutdown: CancellationToken,
        max_retries: u32,
    ) -> Self {
        Self { dispatcher, dedup, audit, tasks, shutdown, max_retries }
    }

    /// Runs the full C9 contract. Returns the dispatched `jobId` for status
    /// polling, or an error if dispatch failed outright.
    ///
    /// A duplicate (dedup rejection) is not an error: it returns `Ok(None)`
    /// after recording the skip in the audit trail, matching step 6 of the
    /// contract ("record a duplicate-skipped audit event and return").
    pub async fn ingest(&self, event: InboundEvent) -> Result<Option<JobId>> {
        let ctx = CorrelationContext::new();

        self.audit
            .log(
                AuditEvent::new(AuditEventType::WebhookReceived, format!("received {}", event.kind))
                    .with_correlation(&ctx)
                    .with_target(event.identity.task_id()),
            )
            .await;

        self.tasks.upsert_task(&event.identity, &event.kind).await?;

        let task_id = event.identity.task_id();
        let job_type = job_type_for_kind(&event.kind);
        let idempotency_key = format!("{job_type}:{task_id}");

        let job = Job::new(job_type, event.payload, &self.shutdown)
            .with_idempotency_key(idempotency_key.clone())
            .with_max_retries(self.max_retries)
            .with_metadata("source", "ingress")
            .with_metadata("correlationId", ctx.correlation_id.clone())
            .with_metadata("taskId", task_id.clone());
        let job_id = job.id;

        if !self.dedup.try_reserve(job_id, &idempotency_key) {
            self.audit
                .log(
                    AuditEvent::new(
                        AuditEventType::JobStateTransition,
                        format!("duplicate skipped for key {idempotency_key}"),
                    )
                    .with_correlation(&ctx)
                    .with_target(task_id),
                )
                .await;
            return Ok(None);
        }

        match self.dispatcher.dispatch(job).await {
            Ok(true) => Ok(Some(job_id)),
            Ok(false) => {
                self.dedup.release(job_id);
                Err(RelayError::no_handler(job_type))
            }
            Err(e) => {
                self.dedup.release(job_id);
                Err(e)
            }
        }
    }
}

fn job_type_for_kind(kind: &str) -> &'static str {
    match kind {
        "issues.opened" | "issue_comment" => "GeneratePlan",
        "plan.approved" => "ExecutePlan",
        _ => "GeneratePlan",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::jobs::queue::JobQueue;
    use crate::jobs::status_store::InMemoryJobStatusStore;
    use crate::jobs::{JobHandler, JobOutcome};
    use parking_lot::Mutex;

    struct RecordingTaskRepository {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TaskRepository for RecordingTaskRepository {
        async fn upsert_task(&self, identity: &TaskIdentity, _kind: &str) -> Result<()> {
            self.calls.lock().push(identity.task_id());
            Ok(())
        }
    }

    struct NoopHandler;

    #[async_trait]
    impl JobHandler for NoopHandler {
        fn job_type(&self) -> &'static str {
            "GeneratePlan"
        }

        async fn execute(&self, _job: &Job, _cancellation: &CancellationToken) -> JobOutcome {
            JobOutcome::success()
        }
    }

    fn build_adapter() -> (IngressAdapter, Arc<JobQueue>) {
        let queue = Arc::new(JobQueue::new(0, true));
        let status_store: Arc<dyn crate::jobs::JobStatusStore> =
            Arc::new(InMemoryJobStatusStore::new());
        let dispatcher = Arc::new(JobDispatcher::new(queue.clone(), status_store));
        dispatcher.register(Arc::new(NoopHandler));
        let dedup = Arc::new(JobDeduplicationService::new());
        let audit = Arc::new(AuditLogger::new(Arc::new(InMemoryAuditSink::new())));
        let tasks = Arc::new(RecordingTaskRepository { calls: Mutex::new(Vec::new()) });
        let adapter = IngressAdapter::new(dispatcher, dedup, audit, tasks, CancellationToken::new(), 3);
        (adapter, queue)
    }

    fn sample_event() -> InboundEvent {
        InboundEvent {
            identity: TaskIdentity { owner: "acme".into(), repo: "widgets".into(), number: 42 },
            kind: "issues.opened".into(),
            payload: Vec::new(),
        }
    }

    #[tokio::test]
    async fn ingest_dispatches_and_enqueues_a_new_event() {
        let (adapter, queue) = build_adapter();
        let job_id = adapter.ingest(sample_event()).await.unwrap();
        assert!(job_id.is_some());
        assert_eq!(queue.count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_event_is_skipped_without_dispatch() {
        let (adapter, queue) = build_adapter();
        let first = adapter.ingest(sample_event()).await.unwrap();
        assert!(first.is_some());

        let second = adapter.ingest(sample_event()).await.unwrap();
        assert!(second.is_none());
        // only the first event's job made it to the queue
        assert_eq!(queue.count().await, 1);
    }

    #[tokio::test]
    async fn dispatch_failure_releases_dedup_reservation() {
        let queue = Arc::new(JobQueue::new(0, true));
        let status_store: Arc<dyn crate::jobs::JobStatusStore> =
            Arc::new(InMemoryJobStatusStore::new());
        let dispatcher = Arc::new(JobDispatcher::new(queue.clone(), status_store));
        // deliberately no handler registered for "GeneratePlan"
        let dedup = Arc::new(JobDeduplicationService::new());
        let audit = Arc::new(AuditLogger::new(Arc::new(InMemoryAuditSink::new())));
        let tasks = Arc::new(RecordingTaskRepository { calls: Mutex::new(Vec::new()) });
        let adapter = IngressAdapter::new(dispatcher, dedup.clone(), audit, tasks, CancellationToken::new(), 3);

        let result = adapter.ingest(sample_event()).await;
        assert!(result.is_err());
        assert_eq!(dedup.lookup_in_flight("GeneratePlan:acme/widgets/issues/42"), None);
    }
}
