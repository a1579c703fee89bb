//! Error handling for Taskforge Core.
//!
//! This module provides:
//! - A stable, machine-readable error code taxonomy for API responses
//! - HTTP status code mapping
//! - User-facing messages kept separate from internal detail
//! - Tracing and metrics integration
//!
//! Authorization outcomes are ordinary errors here: the mutation guard
//! returns `NotFound` before `Forbidden` is ever evaluated when existence
//! fails, and `Forbidden` distinctly once existence is confirmed. Callers
//! that want to blur that distinction for information hiding do so at the
//! routing layer, not in this core.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Taskforge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic
/// error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication (1000-1099)
    Unauthenticated,
    TokenExpired,
    WrongTokenKind,
    InvalidCredentials,
    InactiveAccount,

    // Authorization (1100-1199)
    Forbidden,

    // Resource (2000-2099)
    NotFound,
    Conflict,
    InvalidReference,

    // Validation (2100-2199)
    Validation,

    // Infrastructure (3000-3099)
    Unavailable,
    Database,
    Storage,

    // Configuration / internal (9000-9099)
    Configuration,
    Internal,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::Unauthenticated => 1000,
            Self::TokenExpired => 1001,
            Self::WrongTokenKind => 1002,
            Self::InvalidCredentials => 1003,
            Self::InactiveAccount => 1004,
            Self::Forbidden => 1100,
            Self::NotFound => 2000,
            Self::Conflict => 2001,
            Self::InvalidReference => 2002,
            Self::Validation => 2100,
            Self::Unavailable => 3000,
            Self::Database => 3001,
            Self::Storage => 3002,
            Self::Configuration => 9000,
            Self::Internal => 9001,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated
            | Self::TokenExpired
            | Self::WrongTokenKind
            | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,

            Self::InactiveAccount | Self::Forbidden => StatusCode::FORBIDDEN,

            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,

            Self::InvalidReference | Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,

            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,

            Self::Database | Self::Storage | Self::Configuration | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if this error is retryable by a client.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::Database)
    }

    /// Get the error category for grouping in logs and metrics.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "authentication",
            1100..=1199 => "authorization",
            2000..=2099 => "resource",
            2100..=2199 => "validation",
            3000..=3099 => "infrastructure",
            _ => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Taskforge Core.
///
/// Carries a stable code, a user-safe message, and an optional internal
/// message that only ever reaches the logs.
#[derive(Error, Debug)]
pub struct ForgeError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-friendly error message (safe to expose to clients)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for ForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl ForgeError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
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

    /// Create a missing/invalid-token error.
    pub fn unauthenticated(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    /// Create an expired-token error.
    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired, "The token has expired")
    }

    /// Create a wrong-kind-token error (refresh presented as access or vice versa).
    pub fn wrong_token_kind() -> Self {
        Self::new(
            ErrorCode::WrongTokenKind,
            "The token is not valid for this operation",
        )
    }

    /// Create an invalid-credentials error (login failure).
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "Invalid username or password")
    }

    /// Create an inactive-account error.
    pub fn inactive_account() -> Self {
        Self::new(ErrorCode::InactiveAccount, "This account has been deactivated")
    }

    /// Create a forbidden error with an internal deny reason for the logs.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::Forbidden,
            "You do not have permission to perform this action",
            reason,
        )
    }

    /// Create a not found error.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
    }

    /// Create an invalid-reference error (referenced entity absent or inactive).
    pub fn invalid_reference(detail: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidReference, detail)
    }

    /// Create a duplicate-record conflict.
    pub fn conflict(detail: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Conflict, detail)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Create an unavailable error (fail-closed outcome for fact-fetch failures).
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::Unavailable,
            "The service is temporarily unavailable",
            detail,
        )
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::Internal, "An internal error occurred", message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::Configuration,
            "Service configuration error",
            message,
        )
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

    /// Get the HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging / Metrics
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error at a level matching its category.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        let status = self.http_status().as_u16();

        match self.code {
            ErrorCode::Database
            | ErrorCode::Storage
            | ErrorCode::Configuration
            | ErrorCode::Internal => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "Internal error"
                );
            }
            ErrorCode::Unavailable => {
                warn!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    internal_message = ?self.internal_message,
                    "Dependency unavailable"
                );
            }
            _ => {
                debug!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "Request rejected"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            "taskforge_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
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

    /// Timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&ForgeError> for ErrorResponse {
    fn from(error: &ForgeError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                numeric_code: error.code.numeric_code(),
                message: error.user_message.to_string(),
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for ForgeError {
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

impl From<sqlx::Error> for ForgeError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => {
                (ErrorCode::NotFound, "The requested record was not found")
            }
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    return Self::with_internal(
                        ErrorCode::Conflict,
                        "A record with this identifier already exists",
                        format!("Constraint violation: {}", constraint),
                    )
                    .with_source(error);
                }
                (ErrorCode::Database, "A database error occurred")
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                (ErrorCode::Unavailable, "Unable to reach the database")
            }
            _ => (ErrorCode::Database, "A database error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<tokio::time::error::Elapsed> for ForgeError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        // Deadline overruns on fact fetches must fail closed.
        Self::unavailable("Operation timed out").with_source(error)
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::Internal,
            "Failed to process JSON data",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<std::io::Error> for ForgeError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, user_msg) = match error.kind() {
            ErrorKind::NotFound => (ErrorCode::NotFound, "File or resource not found"),
            ErrorKind::TimedOut => (ErrorCode::Unavailable, "Operation timed out"),
            _ => (ErrorCode::Storage, "A storage error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<config::ConfigError> for ForgeError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}

impl From<anyhow::Error> for ForgeError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<ForgeError>() {
            Ok(forge_error) => forge_error,
            Err(error) => Self::internal(error.to_string()),
        }
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
        assert_eq!(ErrorCode::Unauthenticated.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::TokenExpired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::InactiveAccount.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::InvalidReference.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::Unavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_code_categories() {
        assert_eq!(ErrorCode::TokenExpired.category(), "authentication");
        assert_eq!(ErrorCode::Forbidden.category(), "authorization");
        assert_eq!(ErrorCode::NotFound.category(), "resource");
        assert_eq!(ErrorCode::Validation.category(), "validation");
        assert_eq!(ErrorCode::Unavailable.category(), "infrastructure");
        assert_eq!(ErrorCode::Internal.category(), "internal");
    }

    #[test]
    fn test_error_code_is_retryable() {
        assert!(ErrorCode::Unavailable.is_retryable());
        assert!(!ErrorCode::Forbidden.is_retryable());
        assert!(!ErrorCode::NotFound.is_retryable());
    }

    #[test]
    fn test_forbidden_keeps_reason_internal() {
        let error = ForgeError::forbidden("actor u3 has no relation to task t1");
        assert_eq!(error.code(), ErrorCode::Forbidden);
        assert_eq!(
            error.user_message(),
            "You do not have permission to perform this action"
        );
        assert_eq!(
            error.internal_message(),
            Some("actor u3 has no relation to task t1")
        );
    }

    #[test]
    fn test_not_found_message() {
        let id = uuid::Uuid::new_v4();
        let error = ForgeError::not_found("Task", id);
        assert_eq!(error.code(), ErrorCode::NotFound);
        assert!(error.user_message().contains(&id.to_string()));
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ForgeError::validation("Invalid email format");
        let response = ErrorResponse::from(&error);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("VALIDATION"));
        assert!(json.contains("Invalid email format"));
    }

    #[test]
    fn test_error_display() {
        let error = ForgeError::with_internal(
            ErrorCode::Database,
            "A database error occurred",
            "Connection refused: localhost:5432",
        );

        let display = format!("{}", error);
        assert!(display.contains("Database"));
        assert!(display.contains("Connection refused"));
    }
}
