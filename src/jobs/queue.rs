//! JobQueue: bounded, multi-producer multi-consumer FIFO with a bounded
//! priority-aware dequeue.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use super::model::Job;

/// Bounded batch-peek window (K in the design notes). Every item is
/// considered for dispatch within at most this many subsequent enqueues,
/// which bounds starvation while keeping dequeue latency bounded.
const PEEK_WINDOW: usize = 10;

/// Error returned when a blocking queue operation is cancelled before it
/// could complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

struct QueueState {
    items: VecDeque<Job>,
}

/// A bounded FIFO of `maxQueueSize` capacity (0 = unbounded). `enqueue`
/// blocks when full until space is available or cancellation fires.
/// `dequeue` blocks until an item is available or cancellation fires.
///
/// When prioritization is enabled, dequeue non-blockingly drains up to
/// [`PEEK_WINDOW`] items, picks the highest-priority one (ties broken by
/// drain order, i.e. FIFO), and re-enqueues the remainder to the tail.
pub struct JobQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    enable_prioritization: bool,
    not_empty: Notify,
    not_full: Notify,
}

impl JobQueue {
    /// `capacity == 0` means unbounded.
    pub fn new(capacity: usize, enable_prioritization: bool) -> Self {
        Self {
            state: Mutex::new(QueueState { items: VecDeque::new() }),
            capacity,
            enable_prioritization,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Approximate, monotonic snapshot of queue depth, for health checks.
    pub async fn count(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// Blocks while the queue is full until space frees up or `cancellation`
    /// fires.
    pub async fn enqueue(&self, job: Job, cancellation: &CancellationToken) -> Result<(), Cancelled> {
        let mut job = Some(job);
        loop {
            let notified = self.not_full.notified();
            {
                let mut state = self.state.lock().await;
                if self.capacity == 0 || state.items.len() < self.capacity {
                    state.items.push_back(job.take().expect("job consumed exactly once"));
                    drop(state);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }
            tokio::select! {
                _ = notified => continue,
                _ = cancellation.cancelled() => return Err(Cancelled),
            }
        }
    }

    /// Blocks until an item is available or `cancellation` fires.
    pub async fn dequeue(&self, cancellation: &CancellationToken) -> Option<Job> {
        if self.enable_prioritization {
            self.dequeue_prioritized(cancellation).await
        } else {
            self.dequeue_fifo(cancellation).await
        }
    }

    async fn dequeue_fifo(&self, cancellation: &CancellationToken) -> Option<Job> {
        loop {
            let notified = self.not_empty.notified();
            {
                let mut state = self.state.lock().await;
                if let Some(job) = state.items.pop_front() {
                    drop(state);
                    self.not_full.notify_one();
                    return Some(job);
                }
            }
            tokio::select! {
                _ = notified => continue,
                _ = cancellation.cancelled() => return None,
            }
        }
    }

    async fn dequeue_prioritized(&self, cancellation: &CancellationToken) -> Option<Job> {
        loop {
            let drained: Vec<Job> = {
                let mut state = self.state.lock().await;
                let mut drained = Vec::with_capacity(PEEK_WINDOW);
                for _ in 0..PEEK_WINDOW {
                    match state.items.pop_front() {
                        Some(job) => drained.push(job),
                        None => break,
                    }
                }
                drained
            };

            if drained.is_empty() {
                return self.dequeue_fifo(cancellation).await;
            }

            // Highest priority wins; ties broken by earliest drain position
            // (natural FIFO order).
            let best_index = drained
                .iter()
                .enumerate()
                .max_by_key(|(i, job)| (job.priority, std::cmp::Reverse(*i)))
                .map(|(i, _)| i)
                .expect("drained is non-empty");

            let mut drained = drained;
            let chosen = drained.remove(best_index);

            if !drained.is_empty() {
                let mut state = self.state.lock().await;
                for job in drained.into_iter().rev() {
                    state.items.push_front(job);
                }
                drop(state);
                self.not_empty.notify_waiters();
            }
            self.not_full.notify_waiters();
            return Some(chosen);
        }
    }
}
