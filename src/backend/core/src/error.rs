//! Error handling for Jobboard.
//!
//! This module provides:
//! - A single crate error type with a stable, machine-readable code
//! - HTTP status code mapping for API responses
//! - Transient/permanent classification used by the enrichment retry loop
//! - User-facing messages kept apart from internal detail
//! - Severity-based logging and an error counter
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobboard_core::error::{BoardError, ErrorCode, Result};
//!
//! fn check(page_size: u64) -> Result<()> {
//!     if page_size == 0 {
//!         return Err(BoardError::new(ErrorCode::InvalidInput, "page size must be positive"));
//!     }
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

/// A specialized Result type for Jobboard operations.
pub type Result<T> = std::result::Result<T, BoardError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// The numeric form is what lands in the `code` field of the response
/// envelope; `0` is reserved for success and never produced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Job Errors (1000-1099)
    JobNotFound,

    // Worker Pool Errors (1100-1199)
    PoolSaturated,
    PoolAcquireTimeout,
    PageDeadlineExceeded,

    // Storage Errors (2000-2099)
    DatabaseError,
    DatabaseConnectionFailed,
    DatabaseQueryFailed,
    RecordNotFound,

    // Serialization Errors (2200-2299)
    SerializationError,
    DeserializationError,
    InvalidJson,

    // Flow Service Errors (3000-3099)
    UpstreamError,
    UpstreamRejected,
    UpstreamRateLimited,
    UpstreamUnavailable,
    UpstreamTimeout,
    NetworkError,

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
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::JobNotFound => 1000,

            Self::PoolSaturated => 1100,
            Self::PoolAcquireTimeout => 1101,
            Self::PageDeadlineExceeded => 1102,

            Self::DatabaseError => 2000,
            Self::DatabaseConnectionFailed => 2001,
            Self::DatabaseQueryFailed => 2002,
            Self::RecordNotFound => 2004,

            Self::SerializationError => 2200,
            Self::DeserializationError => 2201,
            Self::InvalidJson => 2202,

            Self::UpstreamError => 3000,
            Self::UpstreamRejected => 3001,
            Self::UpstreamRateLimited => 3002,
            Self::UpstreamUnavailable => 3003,
            Self::UpstreamTimeout => 3004,
            Self::NetworkError => 3005,

            Self::ValidationError => 4100,
            Self::InvalidInput => 4101,
            Self::MissingRequiredField => 4102,
            Self::InvalidFormat => 4103,

            Self::ConfigurationError => 5000,
            Self::MissingConfiguration => 5001,
            Self::InvalidConfiguration => 5002,

            Self::InternalError => 9000,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::JobNotFound | Self::RecordNotFound => StatusCode::NOT_FOUND,

            Self::ValidationError
            | Self::InvalidInput
            | Self::MissingRequiredField
            | Self::InvalidFormat => StatusCode::UNPROCESSABLE_ENTITY,

            Self::PoolSaturated | Self::UpstreamRateLimited => StatusCode::TOO_MANY_REQUESTS,

            Self::PoolAcquireTimeout | Self::PageDeadlineExceeded | Self::UpstreamTimeout => {
                StatusCode::GATEWAY_TIMEOUT
            }

            Self::DatabaseConnectionFailed | Self::UpstreamUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            Self::UpstreamError | Self::UpstreamRejected | Self::NetworkError => {
                StatusCode::BAD_GATEWAY
            }

            Self::DatabaseError
            | Self::DatabaseQueryFailed
            | Self::SerializationError
            | Self::DeserializationError
            | Self::InvalidJson
            | Self::ConfigurationError
            | Self::MissingConfiguration
            | Self::InvalidConfiguration
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error is transient.
    ///
    /// Malformed JSON from the flow service counts as transient: the same
    /// request is retried before the row is given up on.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseConnectionFailed
                | Self::UpstreamRateLimited
                | Self::UpstreamUnavailable
                | Self::UpstreamTimeout
                | Self::NetworkError
                | Self::DeserializationError
                | Self::InvalidJson
        )
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "job",
            1100..=1199 => "worker_pool",
            2000..=2099 => "storage",
            2200..=2299 => "serialization",
            3000..=3099 => "upstream",
            4100..=4199 => "validation",
            5000..=5099 => "configuration",
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

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Caller mistakes (bad input, unknown job)
    Low,
    /// Operational issues (upstream hiccups, saturation)
    Medium,
    /// System errors (storage failures, bad config)
    High,
    /// Needs immediate attention
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::ValidationError
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFormat
            | ErrorCode::JobNotFound
            | ErrorCode::RecordNotFound => Self::Low,

            ErrorCode::PoolSaturated
            | ErrorCode::PoolAcquireTimeout
            | ErrorCode::PageDeadlineExceeded
            | ErrorCode::UpstreamError
            | ErrorCode::UpstreamRejected
            | ErrorCode::UpstreamRateLimited
            | ErrorCode::UpstreamUnavailable
            | ErrorCode::UpstreamTimeout
            | ErrorCode::NetworkError
            | ErrorCode::DeserializationError
            | ErrorCode::InvalidJson => Self::Medium,

            ErrorCode::DatabaseError
            | ErrorCode::DatabaseQueryFailed
            | ErrorCode::SerializationError
            | ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration
            | ErrorCode::InvalidConfiguration => Self::High,

            ErrorCode::DatabaseConnectionFailed
            | ErrorCode::InternalError => Self::Critical,
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

    /// Related entity ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Related entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Field that failed validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
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

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.context.is_empty()
            && self.entity_id.is_none()
            && self.entity_type.is_none()
            && self.field.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Jobboard.
#[derive(Error, Debug)]
pub struct BoardError {
    /// Machine-readable error code
    code: ErrorCode,

    /// Message safe to expose to clients
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl BoardError {
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
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    /// Create a missing-field error for a blank or absent request field.
    pub fn missing_field(field: &'static str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Required field '{}' is missing or blank", field),
        )
        .with_details(ErrorDetails::new().with_field(field))
    }

    /// Create a format error for a field that does not parse.
    pub fn invalid_format(field: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has an invalid value: {}", field, value),
        )
        .with_details(ErrorDetails::new().with_field(field).with_context("value", value))
    }

    /// Create a job not found error.
    pub fn job_not_found(job_id: &str, role: &str, party_id: i64) -> Self {
        Self::new(
            ErrorCode::JobNotFound,
            format!("Job not found: {} ({}/{})", job_id, role, party_id),
        )
        .with_details(
            ErrorDetails::new()
                .with_entity("job", job_id)
                .with_context("role", role)
                .with_context("party_id", party_id),
        )
    }

    /// Create an upstream error from a flow service envelope with a non-zero retcode.
    pub fn upstream(retcode: i64, retmsg: impl Into<String>) -> Self {
        let retmsg = retmsg.into();
        Self::with_internal(
            ErrorCode::UpstreamError,
            if retmsg.is_empty() {
                Cow::Borrowed("Flow service returned an error")
            } else {
                Cow::Owned(retmsg.clone())
            },
            format!("retcode={} retmsg={}", retcode, retmsg),
        )
        .with_context("retcode", retcode)
    }

    /// Create an error for a non-2xx HTTP status from the flow service.
    pub fn upstream_status(status: u16, body: impl Into<String>) -> Self {
        let (code, user_msg) = match status {
            429 => (ErrorCode::UpstreamRateLimited, "Rate limited by flow service"),
            500..=599 => (
                ErrorCode::UpstreamUnavailable,
                "Flow service is temporarily unavailable",
            ),
            _ => (ErrorCode::UpstreamRejected, "Flow service rejected the request"),
        };
        Self::with_internal(code, user_msg, format!("HTTP {}: {}", status, body.into()))
            .with_context("http_status", status)
    }

    /// A row still outstanding when its page's deadline passed.
    pub fn page_deadline_exceeded(deadline: std::time::Duration) -> Self {
        Self::new(ErrorCode::PageDeadlineExceeded, "Page deadline exceeded")
            .with_context("deadline_ms", deadline.as_millis() as u64)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
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

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Check if this error is transient.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging & Metrics
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        let status = self.http_status().as_u16();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "Request failed"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "Request failed"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Request rejected"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            "jobboard_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "retryable" => self.is_retryable().to_string(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error body, shaped like the success envelope with `data` left null.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Numeric error code (never 0)
    pub code: u32,

    /// User-facing message
    pub message: String,

    /// Always null for errors
    pub data: Option<serde_json::Value>,

    /// Symbolic error code
    pub error_code: ErrorCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,

    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&BoardError> for ErrorResponse {
    fn from(error: &BoardError) -> Self {
        Self {
            code: error.code.numeric_code(),
            message: error.user_message.to_string(),
            data: None,
            error_code: error.code,
            details: if error.details.is_empty() {
                None
            } else {
                Some(error.details.clone())
            },
            timestamp: chrono::Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.http_status();
        let response = ErrorResponse::from(&self);

        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<sqlx::Error> for BoardError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => (
                ErrorCode::RecordNotFound,
                "The requested record was not found",
            ),
            sqlx::Error::Database(_) => (ErrorCode::DatabaseQueryFailed, "A database error occurred"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => (
                ErrorCode::DatabaseConnectionFailed,
                "Unable to connect to the database",
            ),
            _ => (ErrorCode::DatabaseError, "A database error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(error: serde_json::Error) -> Self {
        let code = if error.is_eof() {
            ErrorCode::InvalidJson
        } else if error.is_syntax() || error.is_data() {
            ErrorCode::DeserializationError
        } else {
            ErrorCode::SerializationError
        };

        Self::with_internal(code, "Failed to process JSON data", error.to_string())
            .with_source(error)
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            let status = status.as_u16();
            let message = error.to_string();
            return Self::upstream_status(status, message).with_source(error);
        }

        let (code, user_msg) = if error.is_timeout() {
            (ErrorCode::UpstreamTimeout, "Flow service request timed out")
        } else if error.is_connect() {
            (ErrorCode::NetworkError, "Failed to connect to flow service")
        } else if error.is_decode() {
            (ErrorCode::DeserializationError, "Flow service returned an unreadable body")
        } else {
            (ErrorCode::NetworkError, "Network error occurred")
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<tokio::time::error::Elapsed> for BoardError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        Self::with_internal(ErrorCode::UpstreamTimeout, "Operation timed out", error.to_string())
            .with_source(error)
    }
}

impl From<anyhow::Error> for BoardError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<BoardError>() {
            Ok(board_error) => board_error,
            Err(error) => Self::with_internal(
                ErrorCode::InternalError,
                "An internal error occurred",
                error.to_string(),
            ),
        }
    }
}

impl From<config::ConfigError> for BoardError {
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
            _ => (ErrorCode::ConfigurationError, "Configuration error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::JobNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::MissingRequiredField.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::DatabaseQueryFailed.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorCode::UpstreamError.http_status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ErrorCode::UpstreamTimeout.is_retryable());
        assert!(ErrorCode::UpstreamUnavailable.is_retryable());
        assert!(ErrorCode::NetworkError.is_retryable());
        assert!(ErrorCode::DeserializationError.is_retryable());
        assert!(!ErrorCode::UpstreamRejected.is_retryable());
        assert!(!ErrorCode::ValidationError.is_retryable());
        assert!(!ErrorCode::DatabaseQueryFailed.is_retryable());
    }

    #[test]
    fn test_numeric_codes_never_zero() {
        let codes = [
            ErrorCode::JobNotFound,
            ErrorCode::PoolSaturated,
            ErrorCode::DatabaseError,
            ErrorCode::InvalidJson,
            ErrorCode::UpstreamError,
            ErrorCode::ValidationError,
            ErrorCode::ConfigurationError,
            ErrorCode::PageDeadlineExceeded,
            ErrorCode::InternalError,
        ];
        for code in codes {
            assert_ne!(code.numeric_code(), 0, "{code} must not collide with success");
        }
    }

    #[test]
    fn test_upstream_status_mapping() {
        assert_eq!(
            BoardError::upstream_status(503, "down").code(),
            ErrorCode::UpstreamUnavailable
        );
        assert_eq!(
            BoardError::upstream_status(429, "slow down").code(),
            ErrorCode::UpstreamRateLimited
        );
        assert_eq!(
            BoardError::upstream_status(404, "no route").code(),
            ErrorCode::UpstreamRejected
        );
    }

    #[test]
    fn test_malformed_json_is_transient() {
        let err: BoardError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_page_deadline_error() {
        let err = BoardError::page_deadline_exceeded(std::time::Duration::from_millis(250));
        assert_eq!(err.code(), ErrorCode::PageDeadlineExceeded);
        assert_eq!(err.http_status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(!err.is_retryable());
        assert_eq!(err.details().context["deadline_ms"], 250);
    }

    #[test]
    fn test_error_response_envelope() {
        let error = BoardError::missing_field("job_id");
        let response = ErrorResponse::from(&error);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["code"], 4102);
        assert!(json["data"].is_null());
        assert_eq!(json["error_code"], "MISSING_REQUIRED_FIELD");
        assert_eq!(json["details"]["field"], "job_id");
    }

    #[test]
    fn test_upstream_error_keeps_retmsg() {
        let error = BoardError::upstream(101, "error");
        assert_eq!(error.user_message(), "error");
        assert_eq!(error.details().context["retcode"], 101);
    }

    #[test]
    fn test_error_display() {
        let error = BoardError::with_internal(
            ErrorCode::DatabaseError,
            "Database connection failed",
            "Connection refused: localhost:5432",
        );

        let display = format!("{}", error);
        assert!(display.contains("DatabaseError"));
        assert!(display.contains("Database connection failed"));
        assert!(display.contains("Connection refused"));
    }
}
