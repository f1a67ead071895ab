//! JobDispatcher: type → handler registry plus the accept/cancel surface
//! used by ingress and the processor.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::model::{Job, JobId, JobOutcome};
use super::queue::JobQueue;
use super::status_store::JobStatusStore;

/// Implemented once per job type. `execute` returns a `JobOutcome` rather
/// than a `Result` — failures are data, not exceptions, so the processor can
/// distinguish retryable from permanent without downcasting an error type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn job_type(&self) -> &'static str;

    async fn execute(&self, job: &Job, cancellation: &CancellationToken) -> JobOutcome;

    /// Per-handler timeout; `None` means the processor's default applies.
    fn timeout_ms(&self) -> Option<u64> {
        None
    }
}

/// Registry of handlers plus the live in-flight cancellation scopes the
/// processor registers, so `cancel` can reach a running job from outside
/// the worker that owns it.
pub struct JobDispatcher {
    handlers: DashMap<String, Arc<dyn JobHandler>>,
    in_flight: DashMap<JobId, CancellationToken>,
    queue: Arc<JobQueue>,
    status_store: Arc<dyn JobStatusStore>,
}

impl JobDispatcher {
    pub fn new(queue: Arc<JobQueue>, status_store: Arc<dyn JobStatusStore>) -> Self {
        Self {
            handlers: DashMap::new(),
            in_flight: DashMap::new(),
            queue,
            status_store,
        }
    }

    /// Registers `handler` under its own `job_type()`. A second registration
    /// for the same type is logged and ignored — the first registrant wins.
    pub fn register(&self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        if self.handlers.contains_key(&job_type) {
            warn!(job_type = %job_type, "duplicate job handler registration ignored");
            return;
        }
        self.handlers.insert(job_type, handler);
    }

    pub fn resolve(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).map(|h| h.clone())
    }

    /// Writes the initial `Queued` status then enqueues. Returns `false`
    /// without touching storage when no handler is registered for
    /// `job.job_type`. Does not consult deduplication — callers (ingress)
    /// reserve before dispatching.
    pub async fn dispatch(&self, job: Job) -> crate::error::Result<bool> {
        if self.resolve(&job.job_type).is_none() {
            return Ok(false);
        }

        let record = super::status_store::initial_record(&job);
        self.status_store.set(record).await?;

        // Enqueue failure (queue closed, cancellation) does not roll back
        // the status write; the job remains Queued until an operator-side
        // sweep reconciles it.
        let _ = self.queue.enqueue(job, &CancellationToken::new()).await;
        Ok(true)
    }

    /// Called by the processor when a worker begins executing `job_id`, so
    /// `cancel` can find it.
    pub fn track_in_flight(&self, job_id: JobId, scope: CancellationToken) {
        self.in_flight.insert(job_id, scope);
    }

    pub fn untrack_in_flight(&self, job_id: JobId) {
        self.in_flight.remove(&job_id);
    }

    /// Cancels a live in-flight job. Returns `false` if the job is not
    /// currently in flight (already terminal, or not yet dequeued).
    pub fn cancel(&self, job_id: JobId) -> bool {
        match self.in_flight.get(&job_id) {
            Some(scope) => {
                scope.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::Status;
    use crate::jobs::status_store::InMemoryJobStatusStore;

    struct EchoHandler;

    #[async_trait]
    impl JobHandler for EchoHandler {
        fn job_type(&self) -> &'static str {
            "Echo"
        }

        async fn execute(&self, _job: &Job, _cancellation: &CancellationToken) -> JobOutcome {
            JobOutcome::success()
        }
    }

    fn dispatcher() -> JobDispatcher {
        let queue = Arc::new(JobQueue::new(0, false));
        let store: Arc<dyn JobStatusStore> = Arc::new(InMemoryJobStatusStore::new());
        JobDispatcher::new(queue, store)
    }

    #[tokio::test]
    async fn dispatch_rejects_unregistered_type() {
        let dispatcher = dispatcher();
        let root = CancellationToken::new();
        let job = Job::new("Unknown", vec![], &root);
        assert!(!dispatcher.dispatch(job).await.unwrap());
    }

    #[tokio::test]
    async fn dispatch_writes_queued_status_and_enqueues() {
        let dispatcher = dispatcher();
        dispatcher.register(Arc::new(EchoHandler));
        let root = CancellationToken::new();
        let job = Job::new("Echo", vec![], &root);
        let job_id = job.id;

        assert!(dispatcher.dispatch(job).await.unwrap());

        let record = dispatcher.status_store.get(job_id).await.unwrap().unwrap();
        assert_eq!(record.status, Status::Queued);
        assert_eq!(dispatcher.queue.count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_first_handler() {
        struct OtherEcho;
        #[async_trait]
        impl JobHandler for OtherEcho {
            fn job_type(&self) -> &'static str {
                "Echo"
            }
            async fn execute(&self, _job: &Job, _c: &CancellationToken) -> JobOutcome {
                JobOutcome::permanent_failure("should never run")
            }
        }

        let dispatcher = dispatcher();
        dispatcher.register(Arc::new(EchoHandler));
        dispatcher.register(Arc::new(OtherEcho));

        let root = CancellationToken::new();
        let outcome = dispatcher
            .resolve("Echo")
            .unwrap()
            .execute(&Job::new("Echo", vec![], &root), &root)
            .await;
        assert!(matches!(outcome, JobOutcome::Success { .. }));
    }

    #[test]
    fn cancel_returns_false_when_not_in_flight() {
        let dispatcher = dispatcher();
        assert!(!dispatcher.cancel(JobId::new()));
    }

    #[test]
    fn cancel_fires_tracked_scope() {
        let dispatcher = dispatcher();
        let job_id = JobId::new();
        let scope = CancellationToken::new();
        dispatcher.track_in_flight(job_id, scope.clone());

        assert!(dispatcher.cancel(job_id));
        assert!(scope.is_cancelled());
    }
}
