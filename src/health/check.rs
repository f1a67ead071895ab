//! Health check definitions and status types.
//!
//! This module provides:
//! - `HealthStatus` enum representing component health states
//! - `ComponentHealth` struct for individual component health reports
//! - `HealthReport` struct for aggregated system health
//!
//! # Health Status Semantics
//!
//! - **Healthy**: Component is fully operational
//! - **Degraded**: Component is operational but with issues (e.g., high latency)
//! - **Unhealthy**: Component is not operational
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_core::health::{HealthStatus, ComponentHealth, HealthReport};
//!
//! let db_health = ComponentHealth::healthy("database")
//!     .with_message("Connected to PostgreSQL")
//!     .with_latency_ms(5);
//!
//! let report = HealthReport::new()
//!     .with_component(db_health);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Health Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Health status of a component or the entire system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,
    /// Component is operational but with degraded performance or partial functionality
    Degraded,
    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if the status is healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Check if the status is at least partially operational.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    /// Combine two statuses, returning the worse one.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }

    /// Convert to HTTP status code.
    pub fn to_http_status(&self) -> u16 {
        match self {
            Self::Healthy => 200,
            Self::Degraded => 200, // Still operational
            Self::Unhealthy => 503,
        }
    }

    /// Get a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Healthy => "Component is fully operational",
            Self::Degraded => "Component is operational with degraded performance",
            Self::Unhealthy => "Component is not operational",
        }
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::Healthy
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Component Health
// ═══════════════════════════════════════════════════════════════════════════════

/// Health information for a single component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,

    /// Health status
    pub status: HealthStatus,

    /// Optional message describing the current state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Latency of health check in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,

    /// Last check timestamp
    pub checked_at: DateTime<Utc>,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Error details (only present if unhealthy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    /// Create a new healthy component.
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: None,
            latency_ms: None,
            checked_at: Utc::now(),
            metadata: HashMap::new(),
            error: None,
        }
    }

    /// Create a new degraded component.
    pub fn degraded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: None,
            latency_ms: None,
            checked_at: Utc::now(),
            metadata: HashMap::new(),
            error: None,
        }
    }

    /// Create a new unhealthy component.
    pub fn unhealthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: None,
            latency_ms: None,
            checked_at: Utc::now(),
            metadata: HashMap::new(),
            error: None,
        }
    }

    /// Create from a check result.
    pub fn from_result<E: std::fmt::Display>(
        name: impl Into<String>,
        result: Result<(), E>,
        latency: Duration,
    ) -> Self {
        match result {
            Ok(()) => Self::healthy(name).with_latency(latency),
            Err(e) => Self::unhealthy(name)
                .with_error(e.to_string())
                .with_latency(latency),
        }
    }

    /// Add a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Add latency from Duration.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = Some(latency.as_millis() as u64);
        self
    }

    /// Add latency in milliseconds.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Add an error message (sets status to Unhealthy).
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.status = HealthStatus::Unhealthy;
        self.error = Some(error.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: HealthStatus) -> Self {
        self.status = status;
        self
    }

    /// Check if the component is healthy.
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// Check if latency exceeds a threshold (and should be considered degraded).
    pub fn check_latency_threshold(&mut self, threshold_ms: u64) {
        if let Some(latency) = self.latency_ms {
            if latency > threshold_ms && self.status == HealthStatus::Healthy {
                self.status = HealthStatus::Degraded;
                self.message = Some(format!(
                    "High latency detected: {}ms (threshold: {}ms)",
                    latency, threshold_ms
                ));
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Health Report
// ═══════════════════════════════════════════════════════════════════════════════

/// Aggregated health report for the entire system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall system status
    pub status: HealthStatus,

    /// Service name
    pub service: String,

    /// Service version
    pub version: String,

    /// When this report was generated
    pub timestamp: DateTime<Utc>,

    /// Uptime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,

    /// Individual component health reports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentHealth>,

    /// Summary counts
    pub summary: HealthSummary,

    /// Additional system metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl HealthReport {
    /// Create a new health report.
    pub fn new() -> Self {
        Self {
            status: HealthStatus::Healthy,
            service: "relay-core".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_secs: None,
            components: Vec::new(),
            summary: HealthSummary::default(),
            metadata: HashMap::new(),
        }
    }

    /// Add a component health report.
    pub fn with_component(mut self, component: ComponentHealth) -> Self {
        self.status = self.status.combine(component.status);
        self.components.push(component);
        self.update_summary();
        self
    }

    /// Add multiple component health reports.
    pub fn with_components(mut self, components: Vec<ComponentHealth>) -> Self {
        for component in components {
            self.status = self.status.combine(component.status);
            self.components.push(component);
        }
        self.update_summary();
        self
    }

    /// Set the service name.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set the uptime.
    pub fn with_uptime(mut self, uptime: Duration) -> Self {
        self.uptime_secs = Some(uptime.as_secs());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }

    /// Get the overall status.
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Check if the system is healthy.
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// Check if the system is operational (healthy or degraded).
    pub fn is_operational(&self) -> bool {
        self.status.is_operational()
    }

    /// Get the HTTP status code for this report.
    pub fn http_status(&self) -> u16 {
        self.status.to_http_status()
    }

    /// Get a specific component by name.
    pub fn get_component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Update the summary counts.
    fn update_summary(&mut self) {
        let mut healthy = 0;
        let mut degraded = 0;
        let mut unhealthy = 0;

        for component in &self.components {
            match component.status {
                HealthStatus::Healthy => healthy += 1,
                HealthStatus::Degraded => degraded += 1,
                HealthStatus::Unhealthy => unhealthy += 1,
            }
        }

        self.summary = HealthSummary {
            total: self.components.len(),
            healthy,
            degraded,
            unhealthy,
        };
    }
}

impl Default for HealthReport {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Health Summary
// ═══════════════════════════════════════════════════════════════════════════════

/// Summary counts for health report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Total number of components
    pub total: usize,
    /// Number of healthy components
    pub healthy: usize,
    /// Number of degraded components
    pub degraded: usize,
    /// Number of unhealthy components
    pub unhealthy: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Readiness and Liveness
// ═══════════════════════════════════════════════════════════════════════════════

/// Liveness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Whether the service is alive
    pub alive: bool,
    /// Service name
    pub service: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl LivenessResponse {
    /// Create a new liveness response.
    pub fn new(alive: bool) -> Self {
        Self {
            alive,
            service: "relay-core".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Create a healthy liveness response.
    pub fn alive() -> Self {
        Self::new(true)
    }
}

impl Default for LivenessResponse {
    fn default() -> Self {
        Self::alive()
    }
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Service name
    pub service: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Optional reason if not ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// List of unready components
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unready_components: Vec<String>,
}

impl ReadinessResponse {
    /// Create a new readiness response.
    pub fn new(ready: bool) -> Self {
        Self {
            ready,
            service: "relay-core".to_string(),
            timestamp: Utc::now(),
            reason: None,
            unready_components: Vec::new(),
        }
    }

    /// Create a ready response.
    pub fn ready() -> Self {
        Self::new(true)
    }

    /// Create a not ready response.
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            service: "relay-core".to_string(),
            timestamp: Utc::now(),
            reason: Some(reason.into()),
            unready_components: Vec::new(),
        }
    }

    /// Add unready component.
    pub fn with_unready_component(mut self, component: impl Into<String>) -> Self {
        self.unready_components.push(component.into());
        self
    }

    /// Build from health report.
    pub fn from_health_report(report: &HealthReport) -> Self {
        if report.is_operational() {
            Self::ready()
        } else {
            let unready: Vec<String> = report
                .components
                .iter()
                .filter(|c| !c.status.is_operational())
                .map(|c| c.name.clone())
                .collect();

            Self {
                ready: false,
                service: report.service.clone(),
                timestamp: Utc::now(),
                reason: Some("One or more components are unhealthy".to_string()),
                unready_components: unready,
            }
        }
    }
}

impl Default for ReadinessResponse {
    fn default() -> Self {
        Self::ready()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
