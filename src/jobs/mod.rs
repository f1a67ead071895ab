//! Background job orchestration core.
//!
//! A webhook-driven event is turned into a `Job`, deduplicated against
//! in-flight work by idempotency key, queued with a bounded priority-aware
//! FIFO, and run by a worker pool that owns the retry/backoff/dead-letter
//! lifecycle end to end.
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌────────────────────┐
//! │ ingress  │──►│ dedup     │──►│ dispatcher│──►│ queue               │
//! │ (C9)     │   │ (C2)      │   │ (C5)      │   │ (C3)                │
//! └──────────┘   └───────────┘   └───────────┘   └─────────┬──────────┘
//!                                                           ▼
//!                     ┌─────────────────────────────────────────────┐
//!                     │  processor (C6) — worker pool, retry loop    │
//!                     └───────────────────┬───────────────────────┬─┘
//!                                         ▼                       ▼
//!                              status_store (C4)             audit (C7)
//! ```

pub mod builtin;
pub mod dedup;
pub mod dispatcher;
pub mod model;
pub mod processor;
pub mod queue;
pub mod retry;
pub mod routes;
pub mod status_store;

pub use dedup::JobDeduplicationService;
pub use dispatcher::{JobDispatcher, JobHandler};
pub use model::{BackoffStrategy, Job, JobAttempt, JobId, JobOutcome, JobStatusRecord, RetryPolicy, Status};
pub use processor::{BackgroundJobProcessor, ProcessorConfig};
pub use queue::JobQueue;
pub use routes::JobRoutesState;
pub use status_store::{JobFilter, JobMetrics, JobStatusStore, JobTypeMetrics};
