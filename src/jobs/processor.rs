//! BackgroundJobProcessor: the long-lived worker pool that dequeues,
//! dispatches to handlers, and drives the retry/dead-letter lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::audit::{AuditEvent, AuditEventType, AuditLogger, CorrelationContext};
use crate::telemetry::metrics::JobMetrics;

use super::dedup::JobDeduplicationService;
use super::dispatcher::JobDispatcher;
use super::model::{BackoffStrategy, Job, JobAttempt, JobOutcome, RetryPolicy, Status};
use super::queue::JobQueue;
use super::retry;
use super::status_store::JobStatusStore;

/// Tunables that don't belong to `RetryPolicy` itself.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_concurrency: usize,
    pub shutdown_timeout_seconds: u64,
    pub default_handler_timeout_ms: Option<u64>,
    /// `job_type` -> timeout override, consulted when the handler itself
    /// doesn't supply one via `JobHandler::timeout_ms`. Lets operators bound
    /// long-running handler families (e.g. "GeneratePlan", "ExecutePlan")
    /// from configuration without each handler hardcoding its own ceiling.
    pub handler_timeouts_ms: HashMap<String, u64>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            shutdown_timeout_seconds: 30,
            default_handler_timeout_ms: None,
            handler_timeouts_ms: HashMap::new(),
        }
    }
}

/// Owns the dequeue loop and the worker tasks it spawns. `maxConcurrency`
/// workers run at once; the main loop blocks on a semaphore permit before
/// ever calling `queue.dequeue`, so an idle processor holds no job off the
/// queue it couldn't immediately work on.
pub struct BackgroundJobProcessor {
    queue: Arc<JobQueue>,
    status_store: Arc<dyn JobStatusStore>,
    dispatcher: Arc<JobDispatcher>,
    dedup: Arc<JobDeduplicationService>,
    audit: Arc<AuditLogger>,
    retry_policy: RetryPolicy,
    config: ProcessorConfig,
    shutdown: CancellationToken,
}

impl BackgroundJobProcessor {
    pub fn new(
        queue: Arc<JobQueue>,
        status_store: Arc<dyn JobStatusStore>,
        dispatcher: Arc<JobDispatcher>,
        dedup: Arc<JobDeduplicationService>,
        audit: Arc<AuditLogger>,
        retry_policy: RetryPolicy,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            queue,
            status_store,
            dispatcher,
            dedup,
            audit,
            retry_policy,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// A token that fires when `shutdown()` is called; every per-job
    /// cancellation scope is a child of this one.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Spawns the main loop and returns immediately. The returned handle
    /// resolves once the loop has stopped dequeueing and all in-flight
    /// workers have finished (or been force-cancelled at the deadline).
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self: Arc<Self>) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        info!(max_concurrency = self.config.max_concurrency, "job processor started");

        loop {
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => {
                    match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }
                _ = self.shutdown.cancelled() => break,
            };

            let job = self.queue.dequeue(&self.shutdown).await;

            let Some(job) = job else {
                drop(permit);
                if self.shutdown.is_cancelled() {
                    break;
                }
                continue;
            };

            let this = self.clone();
            workers.push(tokio::spawn(async move {
                this.run_worker(job).await;
                drop(permit);
            }));

            workers.retain(|h| !h.is_finished());
        }

        info!("job processor stopped dequeueing, waiting for in-flight workers");

        let deadline = tokio::time::sleep(std::time::Duration::from_secs(self.config.shutdown_timeout_seconds));
        tokio::pin!(deadline);
        let mut remaining = workers;
        loop {
            if remaining.is_empty() {
                break;
            }
            tokio::select! {
                _ = &mut deadline => {
                    warn!(pending = remaining.len(), "shutdown timeout elapsed, force-cancelling remaining workers");
                    self.shutdown.cancel();
                    for handle in remaining {
                        let _ = handle.await;
                    }
                    break;
                }
                _ = futures::future::join_all(remaining.drain(..).collect::<Vec<_>>()) => {
                    break;
                }
            }
        }

        info!("job processor shut down");
    }

    async fn run_worker(&self, job: Job) {
        let scope = job.cancellation.clone();
        self.dispatcher.track_in_flight(job.id, scope.clone());

        let correlation = CorrelationContext::new();
        let started_at = Utc::now();
        let queue_wait_time_ms = (started_at - job.enqueued_at).num_milliseconds().max(0);

        let Some(mut record) = self.status_store.get(job.id).await.unwrap_or(None) else {
            warn!(job_id = %job.id, "worker started for a job with no status record");
            self.dispatcher.untrack_in_flight(job.id);
            return;
        };

        record.status = Status::Processing;
        record.started_at = Some(started_at);
        record.queue_wait_time_ms = Some(queue_wait_time_ms);
        self.set_status(record.clone()).await;

        self.audit
            .log(
                AuditEvent::new(AuditEventType::JobStateTransition, format!("{} -> processing", job.job_type))
                    .with_correlation(&correlation)
                    .with_target(job.id.to_string()),
            )
            .await;

        let Some(handler) = self.dispatcher.resolve(&job.job_type) else {
            record.status = Status::Failed;
            record.completed_at = Some(Utc::now());
            record.error_message = Some(format!("no handler registered for job type '{}'", job.job_type));
            self.set_status(record).await;
            self.dedup.release(job.id);
            self.dispatcher.untrack_in_flight(job.id);
            return;
        };

        let timeout_ms = handler
            .timeout_ms()
            .or_else(|| self.config.handler_timeouts_ms.get(&job.job_type).copied())
            .or(self.config.default_handler_timeout_ms);
        let exec_scope = scope.child_token();
        if let Some(timeout_ms) = timeout_ms {
            let exec_scope = exec_scope.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(timeout_ms)).await;
                exec_scope.cancel();
            });
        }

        let attempt_started = Utc::now();
        let outcome = tokio::select! {
            outcome = handler.execute(&job, &exec_scope) => outcome,
            _ = exec_scope.cancelled() => {
                if scope.is_cancelled() {
                    JobOutcome::retryable_failure("cancelled by shutdown or external cancel")
                } else {
                    JobOutcome::permanent_failure("handler timed out")
                }
            }
        };
        let attempt_completed = Utc::now();
        let cancelled_by_scope = scope.is_cancelled();

        let delay_before_attempt_ms = if job.retry_count == 0 {
            0
        } else {
            job.pending_retry_delay_ms
        };

        let attempt = JobAttempt {
            attempt_number: job.retry_count + 1,
            started_at: attempt_started,
            completed_at: attempt_completed,
            succeeded: matches!(outcome, JobOutcome::Success { .. }),
            error_message: match &outcome {
                JobOutcome::Failure { error_message, .. } => Some(error_message.clone()),
                _ => None,
            },
            exception_type: match &outcome {
                JobOutcome::Failure { error_type, .. } => error_type.clone(),
                _ => None,
            },
            duration_ms: (attempt_completed - attempt_started).num_milliseconds().max(0),
            delay_before_attempt_ms,
            backoff_strategy: Some(self.retry_policy.backoff_strategy),
        };
        super::status_store::append_attempt(&mut record, attempt.clone());
        record.retry_count = job.retry_count;

        // External cancellation always wins, even over a handler that
        // raced to a Success/Failure result right as the scope cancelled:
        // no retry is scheduled and the dedup key is released immediately.
        if cancelled_by_scope {
            record.status = Status::Cancelled;
            record.completed_at = Some(attempt_completed);
            self.set_status(record).await;
            self.dedup.release(job.id);
            self.dispatcher.untrack_in_flight(job.id);
            return;
        }

        match outcome {
            JobOutcome::Success { result_data } => {
                record.status = Status::Completed;
                record.completed_at = Some(attempt_completed);
                record.processing_duration_ms = Some((attempt_completed - started_at).num_milliseconds().max(0));
                record.result_data = result_data;
                self.set_status(record).await;
                self.dedup.release(job.id);
                JobMetrics::record_job_completed(
                    &job.id.to_string(),
                    &job.job_type,
                    (attempt_completed - started_at).num_milliseconds().max(0) as f64 / 1000.0,
                );
            }
            JobOutcome::Failure { error_message, retryable, .. } => {
                let should_retry = retry::should_retry(&self.retry_policy, job.retry_count, job.max_retries, retryable);

                if should_retry {
                    record.status = Status::Retried;
                    record.last_retry_at = Some(Utc::now());
                    record.error_message = Some(error_message);
                    self.set_status(record).await;

                    let delay_ms = retry::compute_delay_ms(&self.retry_policy, job.retry_count);
                    tokio::select! {
                        _ = tokio::time::sleep(std::time::Duration::from_millis(delay_ms)) => {}
                        _ = scope.cancelled() => {}
                    }

                    if !scope.is_cancelled() {
                        let retry_job = job.for_retry(&self.shutdown_parent(&scope), delay_ms as i64);
                        if self.queue.enqueue(retry_job, &self.shutdown.clone()).await.is_err() {
                            error!(job_id = %job.id, "failed to re-enqueue retry; job remains Retried until operator sweep");
                        }
                    }
                } else if !retryable || job.retry_count < job.max_retries {
                    record.status = Status::Failed;
                    record.completed_at = Some(attempt_completed);
                    record.error_message = Some(error_message);
                    self.set_status(record).await;
                    self.dedup.release(job.id);
                    JobMetrics::record_job_failed(&job.id.to_string(), &job.job_type, false);
                } else {
                    record.status = Status::DeadLetter;
                    record.completed_at = Some(attempt_completed);
                    record.error_message = Some(error_message);
                    self.set_status(record).await;
                    self.dedup.release(job.id);
                    JobMetrics::record_job_failed(&job.id.to_string(), &job.job_type, true);
                }
            }
        }

        self.dispatcher.untrack_in_flight(job.id);
    }

    /// The retried job's cancellation is a fresh child of the processor's
    /// own shutdown scope, not of the attempt that just finished — a
    /// timed-out attempt's scope is already cancelled and would poison the
    /// next attempt immediately.
    fn shutdown_parent(&self, _finished_scope: &CancellationToken) -> CancellationToken {
        self.shutdown.clone()
    }

    async fn set_status(&self, record: super::model::JobStatusRecord) {
        if let Err(e) = self.status_store.set(record).await {
            error!(error = %e, "status store write failed; in-process retry on next transition");
        }
    }
}
