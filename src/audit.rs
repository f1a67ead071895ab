//! AuditLogger & CorrelationContext: structured compliance event stream and
//! the correlation id propagated across the ingress -> dispatch -> retry
//! chain.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Propagated by value and rebuilt per attempt via `child()`, scoped to one
/// logical job lifecycle rather than one HTTP request.
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    pub correlation_id: String,
    pub parent_correlation_id: Option<String>,
}

impl CorrelationContext {
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            parent_correlation_id: None,
        }
    }

    /// Derives a child context for a retry chain: fresh id, parent recorded
    /// so the audit trail can still be joined across attempts.
    pub fn child(&self) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            parent_correlation_id: Some(self.correlation_id.clone()),
        }
    }
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle event kinds emitted across the webhook -> job pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    WebhookReceived,
    WebhookValidation,
    TaskStateTransition,
    JobStateTransition,
    ContainerOperation,
    FileOperation,
    PlanGeneration,
    PlanExecution,
    GitHubApiCall,
}

impl AuditEventType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::WebhookReceived => "webhook_received",
            Self::WebhookValidation => "webhook_validation",
            Self::TaskStateTransition => "task_state_transition",
            Self::JobStateTransition => "job_state_transition",
            Self::ContainerOperation => "container_operation",
            Self::FileOperation => "file_operation",
            Self::PlanGeneration => "plan_generation",
            Self::PlanExecution => "plan_execution",
            Self::GitHubApiCall => "github_api_call",
        }
    }
}

/// One compliance-relevant event. `data` is an open bag for event-specific
/// fields that don't warrant their own column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub description: String,
    pub initiator: Option<String>,
    pub target: Option<String>,
    pub result: Option<String>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub data: HashMap<String, serde_json::Value>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, description: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            correlation_id: None,
            description: description.into(),
            initiator: None,
            target: None,
            result: None,
            duration_ms: None,
            error_message: None,
            data: HashMap::new(),
        }
    }

    pub fn with_correlation(mut self, ctx: &CorrelationContext) -> Self {
        self.correlation_id = Some(ctx.correlation_id.clone());
        self
    }

    pub fn with_initiator(mut self, initiator: impl Into<String>) -> Self {
        self.initiator = Some(initiator.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.data.insert(key.into(), value);
        }
        self
    }

    /// Success paths log informational; failures bump to warn/error so
    /// operators can alert on the stream without parsing `result`.
    fn severity_is_error(&self) -> bool {
        self.error_message.is_some()
    }

    fn severity_is_warning(&self) -> bool {
        matches!(self.event_type, AuditEventType::WebhookValidation) && self.error_message.is_none() && self.result.as_deref() == Some("rejected")
    }
}

/// Durable sink for audit events. Implementations must never propagate
/// failures back to the caller — the audit stream is append-only best
/// effort and emission failures are themselves logged, not surfaced.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent);

    /// Deletes rows with `timestamp < cutoff`. Returns the number removed.
    /// Used by the built-in retention sweep.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> crate::error::Result<u64>;

    async fn list(&self, skip: usize, take: usize) -> crate::error::Result<Vec<AuditEvent>>;
}

/// Emits every event through `tracing` unconditionally (so the stream is
/// always visible in logs regardless of durable-sink health) and durably
/// persists through `sink`.
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub async fn log(&self, event: AuditEvent) {
        if event.severity_is_error() {
            error!(
                event_type = event.event_type.as_str(),
                correlation_id = event.correlation_id.as_deref().unwrap_or(""),
                target = event.target.as_deref().unwrap_or(""),
                error = event.error_message.as_deref().unwrap_or(""),
                "{}",
                event.description
            );
        } else if event.severity_is_warning() {
            warn!(
                event_type = event.event_type.as_str(),
                correlation_id = event.correlation_id.as_deref().unwrap_or(""),
                target = event.target.as_deref().unwrap_or(""),
                "{}",
                event.description
            );
        } else {
            info!(
                event_type = event.event_type.as_str(),
                correlation_id = event.correlation_id.as_deref().unwrap_or(""),
                target = event.target.as_deref().unwrap_or(""),
                "{}",
                event.description
            );
        }

        self.sink.record(&event).await;
    }

    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> crate::error::Result<u64> {
        self.sink.delete_older_than(cutoff).await
    }

    pub async fn list(&self, skip: usize, take: usize) -> crate::error::Result<Vec<AuditEvent>> {
        self.sink.list(skip, take).await
    }
}

/// In-process sink: keeps the most recent events in memory, useful for
/// tests and for running without a configured database.
pub struct InMemoryAuditSink {
    events: parking_lot::Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self { events: parking_lot::Mutex::new(Vec::new()) }
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> crate::error::Result<u64> {
        let mut events = self.events.lock();
        let before = events.len();
        events.retain(|e| e.timestamp >= cutoff);
        Ok((before - events.len()) as u64)
    }

    async fn list(&self, skip: usize, take: usize) -> crate::error::Result<Vec<AuditEvent>> {
        let events = self.events.lock();
        Ok(events.iter().skip(skip).take(take).cloned().collect())
    }
}

#[derive(sqlx::FromRow)]
struct AuditLogRow {
    event_type: String,
    timestamp: DateTime<Utc>,
    correlation_id: Option<String>,
    description: String,
    data: serde_json::Value,
    initiator: Option<String>,
    target: Option<String>,
    result: Option<String>,
    duration_ms: Option<i64>,
    error_message: Option<String>,
}

fn parse_event_type(s: &str) -> AuditEventType {
    match s {
        "webhook_received" => AuditEventType::WebhookReceived,
        "webhook_validation" => AuditEventType::WebhookValidation,
        "task_state_transition" => AuditEventType::TaskStateTransition,
        "job_state_transition" => AuditEventType::JobStateTransition,
        "container_operation" => AuditEventType::ContainerOperation,
        "file_operation" => AuditEventType::FileOperation,
        "plan_generation" => AuditEventType::PlanGeneration,
        "plan_execution" => AuditEventType::PlanExecution,
        _ => AuditEventType::GitHubApiCall,
    }
}

/// Durable sink backed by the `audit_logs` table (see `migrations/`).
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn record(&self, event: &AuditEvent) {
        let data = serde_json::to_value(&event.data).unwrap_or(serde_json::Value::Null);
        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (
                event_type, timestamp, correlation_id, description, data,
                initiator, target, result, duration_ms, error_message
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(event.timestamp)
        .bind(&event.correlation_id)
        .bind(&event.description)
        .bind(data)
        .bind(&event.initiator)
        .bind(&event.target)
        .bind(&event.result)
        .bind(event.duration_ms)
        .bind(&event.error_message)
        .execute(&self.pool)
        .await;

        // Emission must never propagate; failures fall back to the
        // tracing stream that already logged this event above.
        if let Err(e) = result {
            error!(error = %e, "failed to persist audit event to durable sink");
        }
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> crate::error::Result<u64> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| crate::error::RelayError::storage_fault(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn list(&self, skip: usize, take: usize) -> crate::error::Result<Vec<AuditEvent>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            "SELECT * FROM audit_logs ORDER BY timestamp DESC OFFSET $1 LIMIT $2",
        )
        .bind(skip as i64)
        .bind(take as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| crate::error::RelayError::storage_fault(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| AuditEvent {
                event_type: parse_event_type(&row.event_type),
                timestamp: row.timestamp,
                correlation_id: row.correlation_id,
                description: row.description,
                initiator: row.initiator,
                target: row.target,
                result: row.result,
                duration_ms: row.duration_ms,
                error_message: row.error_message,
                data: serde_json::from_value(row.data).unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_context_preserves_parent_id() {
        let root = CorrelationContext::new();
        let child = root.child();
        assert_eq!(child.parent_correlation_id.as_deref(), Some(root.correlation_id.as_str()));
        assert_ne!(child.correlation_id, root.correlation_id);
    }

    #[tokio::test]
    async fn logger_records_through_sink() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let logger = AuditLogger::new(sink.clone());
        let ctx = CorrelationContext::new();

        logger
            .log(AuditEvent::new(AuditEventType::JobStateTransition, "queued").with_correlation(&ctx))
            .await;

        let events = logger.list(0, 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id.as_deref(), Some(ctx.correlation_id.as_str()));
    }

    #[tokio::test]
    async fn retention_sweep_deletes_only_older_rows() {
        let sink = InMemoryAuditSink::new();
        let mut old_event = AuditEvent::new(AuditEventType::JobStateTransition, "old");
        old_event.timestamp = Utc::now() - chrono::Duration::days(120);
        sink.record(&old_event).await;
        sink.record(&AuditEvent::new(AuditEventType::JobStateTransition, "new")).await;

        let cutoff = Utc::now() - chrono::Duration::days(90);
        let deleted = sink.delete_older_than(cutoff).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(sink.list(0, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn error_event_is_flagged_for_error_severity() {
        let event = AuditEvent::new(AuditEventType::GitHubApiCall, "call failed").with_error("timeout");
        assert!(event.severity_is_error());
    }
}
