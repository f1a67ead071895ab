//! Production-grade error handling for Relay Core.
//!
//! This module provides:
//! - Comprehensive error types with context and chaining
//! - HTTP status code mapping for API responses
//! - Error codes for machine-readable API responses
//! - User-friendly messages vs detailed internal messages
//! - Error logging with tracing integration
//! - Metrics integration for error tracking
//!
//! # Usage
//!
//! ```rust,ignore
//! use relay_core::error::{RelayError, Result, ErrorContext};
//!
//! fn my_function() -> Result<()> {
//!     some_operation()
//!         .context("Failed to perform operation")
//!         .with_error_code(ErrorCode::InternalError)?;
//!     Ok(())
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Apex operations.
pub type Result<T> = std::result::Result<T, RelayError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Generic state-transition/record errors (1000-1099)
    InvalidStateTransition,
    TaskNotFound,
    TaskAlreadyExists,

    // Database Errors (2000-2099)
    DatabaseError,
    DatabaseConnectionFailed,
    DatabaseQueryFailed,
    DatabaseTransactionFailed,
    RecordNotFound,
    DuplicateRecord,

    // Serialization Errors (2200-2299)
    SerializationError,
    DeserializationError,
    InvalidJson,

    // External Service Errors (3000-3099)
    ExternalServiceError,
    NetworkError,

    // Authentication/Authorization (4000-4099)
    Unauthorized,
    Forbidden,
    InvalidToken,
    TokenExpired,

    // Validation Errors (4100-4199)
    ValidationError,
    InvalidInput,
    MissingRequiredField,
    InvalidFormat,

    // Configuration Errors (5000-5099)
    ConfigurationError,
    MissingConfiguration,
    InvalidConfiguration,

    // Internal Errors (9000-9099)
    InternalError,
    NotImplemented,
    UnknownError,

    // Job Errors (6000-6099)
    NoHandler,
    PayloadInvalid,
    PreconditionFailed,
    TransientHandlerFailure,
    PermanentHandlerFailure,
    JobTimeout,
    JobCancelled,
    StorageFault,
    QueueFull,
    DuplicateJob,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            // Generic state/record errors
            Self::TaskNotFound => 1002,
            Self::TaskAlreadyExists => 1003,
            Self::InvalidStateTransition => 1004,

            // Database Errors
            Self::DatabaseError => 2000,
            Self::DatabaseConnectionFailed => 2001,
            Self::DatabaseQueryFailed => 2002,
            Self::DatabaseTransactionFailed => 2003,
            Self::RecordNotFound => 2004,
            Self::DuplicateRecord => 2005,

            // Serialization Errors
            Self::SerializationError => 2200,
            Self::DeserializationError => 2201,
            Self::InvalidJson => 2202,

            // External Service Errors
            Self::ExternalServiceError => 3004,
            Self::NetworkError => 3005,

            // Auth Errors
            Self::Unauthorized => 4000,
            Self::Forbidden => 4001,
            Self::InvalidToken => 4002,
            Self::TokenExpired => 4003,

            // Validation Errors
            Self::ValidationError => 4100,
            Self::InvalidInput => 4101,
            Self::MissingRequiredField => 4102,
            Self::InvalidFormat => 4103,

            // Configuration Errors
            Self::ConfigurationError => 5000,
            Self::MissingConfiguration => 5001,
            Self::InvalidConfiguration => 5002,

            // Internal Errors
            Self::InternalError => 9000,
            Self::NotImplemented => 9001,
            Self::UnknownError => 9099,

            // Job Errors
            Self::NoHandler => 6000,
            Self::PayloadInvalid => 6001,
            Self::PreconditionFailed => 6002,
            Self::TransientHandlerFailure => 6003,
            Self::PermanentHandlerFailure => 6004,
            Self::JobTimeout => 6005,
            Self::JobCancelled => 6006,
            Self::StorageFault => 6007,
            Self::QueueFull => 6008,
            Self::DuplicateJob => 6009,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            // Not Found (404)
            Self::TaskNotFound | Self::RecordNotFound | Self::NoHandler => StatusCode::NOT_FOUND,

            // Conflict (409)
            Self::TaskAlreadyExists
            | Self::DuplicateRecord
            | Self::InvalidStateTransition
            | Self::DuplicateJob => StatusCode::CONFLICT,

            // Unprocessable Entity (422)
            Self::ValidationError
            | Self::InvalidInput
            | Self::MissingRequiredField
            | Self::InvalidFormat
            | Self::PayloadInvalid
            | Self::PreconditionFailed => StatusCode::UNPROCESSABLE_ENTITY,

            // Too Many Requests (429)
            Self::QueueFull => StatusCode::TOO_MANY_REQUESTS,

            // Timeout (504)
            Self::JobTimeout => StatusCode::GATEWAY_TIMEOUT,

            // Unauthorized (401)
            Self::Unauthorized | Self::InvalidToken | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            // Forbidden (403)
            Self::Forbidden => StatusCode::FORBIDDEN,

            // Service Unavailable (503)
            Self::DatabaseConnectionFailed | Self::ExternalServiceError => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // Bad Gateway (502)
            Self::NetworkError => StatusCode::BAD_GATEWAY,

            // Not Implemented (501)
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,

            // Cancelled (409; 499 is non-standard)
            Self::JobCancelled => StatusCode::CONFLICT,

            // Internal Server Error (500)
            Self::DatabaseError
            | Self::DatabaseQueryFailed
            | Self::DatabaseTransactionFailed
            | Self::SerializationError
            | Self::DeserializationError
            | Self::InvalidJson
            | Self::ConfigurationError
            | Self::MissingConfiguration
            | Self::InvalidConfiguration
            | Self::PermanentHandlerFailure
            | Self::TransientHandlerFailure
            | Self::StorageFault
            | Self::InternalError
            | Self::UnknownError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error is retryable.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseConnectionFailed
                | Self::DatabaseQueryFailed
                | Self::NetworkError
                | Self::ExternalServiceError
                | Self::TransientHandlerFailure
                | Self::StorageFault
                | Self::QueueFull
        )
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "state",
            2000..=2099 => "database",
            2200..=2299 => "serialization",
            3000..=3099 => "external_service",
            4000..=4099 => "authentication",
            4100..=4199 => "validation",
            5000..=5099 => "configuration",
            6000..=6099 => "job",
            9000..=9099 => "internal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging and alerting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// User errors (bad input, validation failures)
    Low,
    /// Operational issues (rate limits, timeouts)
    Medium,
    /// System errors (database failures, critical bugs)
    High,
    /// Critical errors requiring immediate attention
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            // Low severity - user errors
            ErrorCode::ValidationError
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFormat
            | ErrorCode::TaskNotFound
            | ErrorCode::RecordNotFound
            | ErrorCode::TaskAlreadyExists
            | ErrorCode::DuplicateRecord
            | ErrorCode::InvalidStateTransition
            | ErrorCode::NoHandler
            | ErrorCode::PayloadInvalid
            | ErrorCode::PreconditionFailed
            | ErrorCode::DuplicateJob
            | ErrorCode::JobCancelled => Self::Low,

            // Medium severity - operational
            ErrorCode::NotImplemented
            | ErrorCode::JobTimeout
            | ErrorCode::QueueFull
            | ErrorCode::TransientHandlerFailure => Self::Medium,

            // High severity - system errors
            ErrorCode::DatabaseError
            | ErrorCode::DatabaseQueryFailed
            | ErrorCode::DatabaseTransactionFailed
            | ErrorCode::SerializationError
            | ErrorCode::DeserializationError
            | ErrorCode::InvalidJson
            | ErrorCode::NetworkError
            | ErrorCode::ExternalServiceError
            | ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration
            | ErrorCode::InvalidConfiguration
            | ErrorCode::Unauthorized
            | ErrorCode::Forbidden
            | ErrorCode::InvalidToken
            | ErrorCode::TokenExpired
            | ErrorCode::PermanentHandlerFailure
            | ErrorCode::StorageFault => Self::High,

            // Critical severity
            ErrorCode::DatabaseConnectionFailed
            | ErrorCode::InternalError
            | ErrorCode::UnknownError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Additional structured details about an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context key-value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Related entity ID (task, agent, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Related entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Retry information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,

    /// Suggested action for resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,

    /// Documentation link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_secs = Some(seconds);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggested_action = Some(suggestion.into());
        self
    }

    pub fn with_docs(mut self, url: impl Into<String>) -> Self {
        self.docs_url = Some(url.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Relay Core.
///
/// This error type supports:
/// - Structured error codes for API responses
/// - Error chaining with context
/// - User-friendly vs internal messages
/// - HTTP status code mapping
/// - Metrics integration
#[derive(Error, Debug)]
#[allow(dead_code)]
pub struct RelayError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-friendly error message (safe to expose to clients)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,

    /// Backtrace for debugging (captured in debug builds)
    #[cfg(debug_assertions)]
    backtrace: Option<std::backtrace::Backtrace>,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl RelayError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
            #[cfg(debug_assertions)]
            backtrace: Some(std::backtrace::Backtrace::capture()),
        };
        error.record_metrics();
        error
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create an internal error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An internal error occurred",
            message,
        )
    }

    /// Create a not found error.
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("{} not found: {}", entity_type, entity_id),
        )
        .with_details(ErrorDetails::new().with_entity(&entity_type, &entity_id))
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add error details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add internal message.
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    /// Add context to details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the user-friendly message.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Get the internal message (if any).
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Get the error details.
    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    /// Get the legacy error code string (for backward compatibility).
    pub fn error_code(&self) -> &'static str {
        match self.code {
            ErrorCode::TaskNotFound => "TASK_NOT_FOUND",
            ErrorCode::TaskAlreadyExists => "TASK_EXISTS",
            ErrorCode::InvalidStateTransition => "INVALID_STATE",
            ErrorCode::DatabaseError | ErrorCode::DatabaseConnectionFailed | ErrorCode::DatabaseQueryFailed | ErrorCode::DatabaseTransactionFailed => "DATABASE_ERROR",
            ErrorCode::SerializationError | ErrorCode::DeserializationError | ErrorCode::InvalidJson => "SERIALIZATION_ERROR",
            ErrorCode::ConfigurationError | ErrorCode::MissingConfiguration | ErrorCode::InvalidConfiguration => "CONFIG_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::NoHandler => "NO_HANDLER",
            ErrorCode::QueueFull => "QUEUE_FULL",
            ErrorCode::DuplicateJob => "DUPLICATE_JOB",
            ErrorCode::StorageFault => "STORAGE_FAULT",
            _ => "UNKNOWN_ERROR",
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        let status = self.http_status().as_u16();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    details = ?self.details,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Low severity error"
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    /// Record error metrics.
    fn record_metrics(&self) {
        counter!(
            "apex_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
            "retryable" => self.is_retryable().to_string(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Whether the request was successful (always false for errors)
    pub success: bool,

    /// Error information
    pub error: ErrorInfo,
}

/// Detailed error information for API responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code
    pub numeric_code: u32,

    /// User-friendly error message
    pub message: String,

    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,

    /// Request ID for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&RelayError> for ErrorResponse {
    fn from(error: &RelayError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                numeric_code: error.code.numeric_code(),
                message: error.user_message.to_string(),
                details: if error.details.context.is_empty()
                    && error.details.entity_id.is_none()
                    && error.details.retry_after_secs.is_none()
                {
                    None
                } else {
                    Some(error.details.clone())
                },
                request_id: None, // Set by middleware
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // Log the error
        self.log();

        let status = self.http_status();
        let response = ErrorResponse::from(&self);

        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with error code.
    fn with_error_code(self, code: ErrorCode) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            RelayError::internal(message.into()).with_source(e)
        })
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.map_err(|e| {
            RelayError::new(code, e.to_string()).with_source(e)
        })
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| RelayError::new(ErrorCode::RecordNotFound, message.into()))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.ok_or_else(|| RelayError::new(code, "Resource not found"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<sqlx::Error> for RelayError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => (
                ErrorCode::RecordNotFound,
                "The requested record was not found",
            ),
            sqlx::Error::Database(db_err) => {
                // Handle specific database error codes
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("unique") || constraint.contains("pkey") {
                        return Self::with_internal(
                            ErrorCode::DuplicateRecord,
                            "A record with this identifier already exists",
                            format!("Constraint violation: {}", constraint),
                        )
                        .with_source(error);
                    }
                }
                (
                    ErrorCode::DatabaseQueryFailed,
                    "A database error occurred",
                )
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => (
                ErrorCode::DatabaseConnectionFailed,
                "Unable to connect to the database",
            ),
            _ => (
                ErrorCode::DatabaseError,
                "A database error occurred",
            ),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(error: serde_json::Error) -> Self {
        let code = if error.is_syntax() || error.is_data() {
            ErrorCode::DeserializationError
        } else if error.is_eof() {
            ErrorCode::InvalidJson
        } else {
            ErrorCode::SerializationError
        };

        Self::with_internal(
            code,
            "Failed to process JSON data",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<tokio::sync::AcquireError> for RelayError {
    fn from(error: tokio::sync::AcquireError) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "Resource acquisition failed",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<tokio::time::error::Elapsed> for RelayError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        Self::with_internal(
            ErrorCode::JobTimeout,
            "Operation timed out",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<std::io::Error> for RelayError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, user_msg) = match error.kind() {
            ErrorKind::NotFound => (ErrorCode::RecordNotFound, "File or resource not found"),
            ErrorKind::PermissionDenied => (ErrorCode::Forbidden, "Permission denied"),
            ErrorKind::TimedOut => (ErrorCode::JobTimeout, "Operation timed out"),
            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => {
                (ErrorCode::NetworkError, "Connection failed")
            }
            _ => (ErrorCode::InternalError, "An I/O error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(error: anyhow::Error) -> Self {
        // Try to downcast to RelayError first
        match error.downcast::<RelayError>() {
            Ok(apex_error) => apex_error,
            Err(error) => {
                Self::with_internal(
                    ErrorCode::InternalError,
                    "An internal error occurred",
                    error.to_string(),
                )
            }
        }
    }
}

impl From<config::ConfigError> for RelayError {
    fn from(error: config::ConfigError) -> Self {
        let (code, user_msg) = match &error {
            config::ConfigError::NotFound(_) => (
                ErrorCode::MissingConfiguration,
                "Required configuration not found",
            ),
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => (
                ErrorCode::InvalidConfiguration,
                "Configuration file is invalid",
            ),
            _ => (
                ErrorCode::ConfigurationError,
                "Configuration error occurred",
            ),
        };

        Self::with_internal(code, user_msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Convenience Constructors for Domain Errors
// ═══════════════════════════════════════════════════════════════════════════════

impl RelayError {
    // ─────────────────────────────────────────────────────────────────────────
    // Generic state/record errors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a task not found error.
    pub fn task_not_found(task_id: uuid::Uuid) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
        .with_details(ErrorDetails::new().with_entity("task", task_id.to_string()))
    }

    /// Create a task already exists error.
    pub fn task_already_exists(task_id: uuid::Uuid) -> Self {
        Self::new(
            ErrorCode::TaskAlreadyExists,
            format!("Task already exists: {}", task_id),
        )
        .with_details(ErrorDetails::new().with_entity("task", task_id.to_string()))
    }

    /// Create an invalid state transition error.
    pub fn invalid_state_transition(from: impl std::fmt::Debug, to: impl std::fmt::Debug) -> Self {
        Self::new(
            ErrorCode::InvalidStateTransition,
            format!("Invalid task state transition: {:?} -> {:?}", from, to),
        )
        .with_context("from_state", format!("{:?}", from))
        .with_context("to_state", format!("{:?}", to))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message.into())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Job Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// No handler registered for a job type.
    pub fn no_handler(job_type: impl Into<String>) -> Self {
        let job_type = job_type.into();
        Self::new(
            ErrorCode::NoHandler,
            format!("No handler registered for job type: {}", job_type),
        )
        .with_details(ErrorDetails::new().with_entity("job_type", &job_type))
    }

    /// Job payload failed to deserialize or validate.
    pub fn payload_invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadInvalid, reason.into())
    }

    /// A precondition the handler depends on was not met (e.g. referenced entity missing).
    pub fn precondition_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::PreconditionFailed, reason.into())
    }

    /// A job exceeded its per-type execution timeout.
    pub fn job_timeout(job_id: impl Into<String>, timeout_secs: u64) -> Self {
        let job_id = job_id.into();
        Self::new(
            ErrorCode::JobTimeout,
            format!("Job {} exceeded timeout of {}s", job_id, timeout_secs),
        )
        .with_context("timeout_secs", timeout_secs)
        .with_details(ErrorDetails::new().with_entity("job", &job_id))
    }

    /// Job execution was cancelled.
    pub fn job_cancelled(job_id: impl Into<String>) -> Self {
        let job_id = job_id.into();
        Self::new(ErrorCode::JobCancelled, format!("Job {} was cancelled", job_id))
            .with_details(ErrorDetails::new().with_entity("job", &job_id))
    }

    /// The job queue is at capacity.
    pub fn queue_full(capacity: usize) -> Self {
        Self::new(
            ErrorCode::QueueFull,
            format!("Job queue is at capacity ({})", capacity),
        )
        .with_context("capacity", capacity)
    }

    /// A job with the same idempotency key is already in flight.
    pub fn duplicate_job(idempotency_key: impl Into<String>, in_flight_job_id: impl Into<String>) -> Self {
        let key = idempotency_key.into();
        let in_flight = in_flight_job_id.into();
        Self::new(
            ErrorCode::DuplicateJob,
            format!("Job with idempotency key '{}' is already in flight as {}", key, in_flight),
        )
        .with_context("idempotency_key", &key)
        .with_context("in_flight_job_id", &in_flight)
    }

    /// The status store failed to persist a transition.
    pub fn storage_fault(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageFault, reason.into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
