//! Built-in maintenance job: periodic audit-log retention sweep.
//!
//! The spec calls for exactly one background maintenance concern (audit
//! retention) and no general cron/interval scheduler, so this owns its own
//! simple interval loop rather than reaching for `jobs::scheduler`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::audit::AuditLogger;

use super::dispatcher::{JobDispatcher, JobHandler};
use super::model::{Job, JobOutcome};

pub const AUDIT_RETENTION_JOB_TYPE: &str = "AuditRetentionSweep";

/// Deletes `audit_logs` rows older than `retention_days`. Low priority,
/// limited retries — a missed sweep is corrected by the next scheduled run,
/// same posture as the teacher's `CleanupOldLogsJob`.
pub struct AuditRetentionJob {
    retention_days: i64,
    audit: Arc<AuditLogger>,
}

impl AuditRetentionJob {
    pub fn new(audit: Arc<AuditLogger>, retention_days: u32) -> Self {
        Self { retention_days: retention_days as i64, audit }
    }
}

#[async_trait]
impl JobHandler for AuditRetentionJob {
    fn job_type(&self) -> &'static str {
        AUDIT_RETENTION_JOB_TYPE
    }

    async fn execute(&self, _job: &Job, _cancellation: &CancellationToken) -> JobOutcome {
        let cutoff = Utc::now() - chrono::Duration::days(self.retention_days);
        match self.audit.delete_older_than(cutoff).await {
            Ok(deleted) => {
                info!(deleted, retention_days = self.retention_days, "audit retention sweep complete");
                JobOutcome::success_with(serde_json::json!({ "deleted": deleted }))
            }
            Err(e) => JobOutcome::retryable_failure(format!("audit retention sweep failed: {e}")),
        }
    }
}

/// Spawns a background task that enqueues an `AuditRetentionSweep` job on
/// `interval`, stopping when `shutdown` fires. Runs forever in practice;
/// the processor's own worker pool does the actual deletion work so the
/// sweep participates in the same retry/dead-letter machinery as any other
/// job type.
pub fn spawn_retention_sweep(
    dispatcher: Arc<JobDispatcher>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.cancelled() => break,
            }

            let job = Job::new(AUDIT_RETENTION_JOB_TYPE, Vec::new(), &shutdown)
                .with_priority(-10)
                .with_max_retries(2);

            match dispatcher.dispatch(job).await {
                Ok(true) => {}
                Ok(false) => error!("audit retention sweep has no registered handler"),
                Err(e) => error!(error = %e, "failed to dispatch audit retention sweep"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::jobs::queue::JobQueue;
    use crate::jobs::status_store::InMemoryJobStatusStore;

    #[tokio::test]
    async fn sweep_deletes_rows_older_than_retention_window() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let audit = Arc::new(AuditLogger::new(sink.clone()));

        let mut old_event = crate::audit::AuditEvent::new(
            crate::audit::AuditEventType::JobStateTransition,
            "old",
        );
        old_event.timestamp = Utc::now() - chrono::Duration::days(200);
        sink.record(&old_event).await;

        let job_handler = AuditRetentionJob::new(audit.clone(), 90);
        let root = CancellationToken::new();
        let job = Job::new(AUDIT_RETENTION_JOB_TYPE, Vec::new(), &root);
        let outcome = job_handler.execute(&job, &root).await;

        assert!(matches!(outcome, JobOutcome::Success { .. }));
        assert_eq!(audit.list(0, 10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn sweep_loop_dispatches_on_tick() {
        let queue = Arc::new(JobQueue::new(0, false));
        let status_store: Arc<dyn crate::jobs::status_store::JobStatusStore> =
            Arc::new(InMemoryJobStatusStore::new());
        let dispatcher = Arc::new(JobDispatcher::new(queue.clone(), status_store));
        let audit = Arc::new(AuditLogger::new(Arc::new(InMemoryAuditSink::new())));
        dispatcher.register(Arc::new(AuditRetentionJob::new(audit, 90)));

        let shutdown = CancellationToken::new();
        let handle = spawn_retention_sweep(dispatcher.clone(), Duration::from_millis(5), shutdown.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

        assert!(queue.count().await >= 1);
    }
}
