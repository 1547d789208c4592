//! Error handling for Palisade Core.
//!
//! This module provides:
//! - Machine-readable error codes with HTTP status mapping
//! - User-friendly messages vs detailed internal messages
//! - A single translation point from authorization denials to transport
//!   responses
//! - Metrics integration for error tracking

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
use tracing::{error, warn};

use crate::rbac::DenyReason;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Palisade operations.
pub type Result<T> = std::result::Result<T, PalisadeError>;

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
    // Authorization denials (4000-4099)
    NotAuthenticated,
    InsufficientPermission,
    NotOwner,
    NotManagerOfTarget,
    InvalidRoleAssignment,
    MalformedTargetReference,
    ResourceNotFound,

    // Validation errors (4100-4199)
    ValidationError,
    DuplicateRecord,

    // Storage errors (2000-2099)
    StorageError,

    // Configuration errors (5000-5099)
    ConfigurationError,

    // Internal errors (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::NotAuthenticated => 4000,
            Self::InsufficientPermission => 4001,
            Self::NotOwner => 4002,
            Self::NotManagerOfTarget => 4003,
            Self::InvalidRoleAssignment => 4004,
            Self::MalformedTargetReference => 4005,
            Self::ResourceNotFound => 4006,

            Self::ValidationError => 4100,
            Self::DuplicateRecord => 4101,

            Self::StorageError => 2000,

            Self::ConfigurationError => 5000,

            Self::InternalError => 9000,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,

            Self::InsufficientPermission
            | Self::NotOwner
            | Self::NotManagerOfTarget
            | Self::InvalidRoleAssignment => StatusCode::FORBIDDEN,

            Self::MalformedTargetReference | Self::ValidationError | Self::DuplicateRecord => {
                StatusCode::BAD_REQUEST
            }

            Self::ResourceNotFound => StatusCode::NOT_FOUND,

            Self::StorageError | Self::ConfigurationError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error category for grouping in metrics.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            2000..=2099 => "storage",
            4000..=4099 => "authorization",
            4100..=4199 => "validation",
            5000..=5099 => "configuration",
            _ => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<DenyReason> for ErrorCode {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotAuthenticated => Self::NotAuthenticated,
            DenyReason::InsufficientPermission => Self::InsufficientPermission,
            DenyReason::NotOwner => Self::NotOwner,
            DenyReason::NotManagerOfTarget => Self::NotManagerOfTarget,
            DenyReason::InvalidRoleAssignment => Self::InvalidRoleAssignment,
            DenyReason::MalformedTargetReference => Self::MalformedTargetReference,
            DenyReason::ResourceNotFound => Self::ResourceNotFound,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Palisade Core.
#[derive(Error, Debug)]
#[error("[{code}] {user_message}")]
pub struct PalisadeError {
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

impl PalisadeError {
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

    /// An authorization denial. All denials are expected, operational
    /// outcomes, never crashes.
    pub fn denied(reason: DenyReason) -> Self {
        Self::new(reason.into(), reason.message())
    }

    /// Create a not found error.
    pub fn not_found(entity_type: impl fmt::Display, entity_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found: {}", entity_type, entity_id),
        )
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create a duplicate-record error.
    pub fn duplicate(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::DuplicateRecord, message)
    }

    /// Create an internal error (500) with a log-only detail message.
    pub fn internal(message: impl Into<String>) -> Self {
        let mut error = Self::new(ErrorCode::InternalError, "An internal error occurred");
        error.internal_message = Some(message.into());
        error
    }

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add internal message.
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

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

    fn record_metrics(&self) {
        counter!(
            "palisade_errors_total",
            "code" => format!("{}", self.code),
            "category" => self.code.category(),
        )
        .increment(1);
    }
}

impl From<DenyReason> for PalisadeError {
    fn from(reason: DenyReason) -> Self {
        Self::denied(reason)
    }
}

impl IntoResponse for PalisadeError {
    fn into_response(self) -> Response {
        let status = self.http_status();

        if status.is_server_error() {
            error!(
                code = %self.code,
                internal = self.internal_message.as_deref().unwrap_or(""),
                "request failed"
            );
        } else {
            warn!(code = %self.code, "request rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.code,
                "message": self.user_message,
            }
        });

        (status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_status_mapping() {
        assert_eq!(
            PalisadeError::denied(DenyReason::NotAuthenticated).http_status(),
            StatusCode::UNAUTHORIZED
        );
        for reason in [
            DenyReason::InsufficientPermission,
            DenyReason::NotOwner,
            DenyReason::NotManagerOfTarget,
            DenyReason::InvalidRoleAssignment,
        ] {
            assert_eq!(
                PalisadeError::denied(reason).http_status(),
                StatusCode::FORBIDDEN
            );
        }
        assert_eq!(
            PalisadeError::denied(DenyReason::MalformedTargetReference).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PalisadeError::denied(DenyReason::ResourceNotFound).http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_internal_message_not_in_user_message() {
        let err = PalisadeError::internal("store handle poisoned");
        assert_eq!(err.user_message(), "An internal error occurred");
        assert_eq!(err.internal_message(), Some("store handle poisoned"));
    }

    #[test]
    fn test_error_code_categories() {
        assert_eq!(ErrorCode::NotOwner.category(), "authorization");
        assert_eq!(ErrorCode::ValidationError.category(), "validation");
        assert_eq!(ErrorCode::StorageError.category(), "storage");
        assert_eq!(ErrorCode::InternalError.category(), "internal");
    }

    #[test]
    fn test_not_found_message() {
        let err = PalisadeError::not_found("post", "p-42");
        assert_eq!(err.code(), ErrorCode::ResourceNotFound);
        assert_eq!(err.user_message(), "post not found: p-42");
    }
}
