//! Error handling module for the StudySpot Live service.
//!
//! `StoreError` classifies failures at the remote store boundary. `AppError` is the
//! HTTP-facing error with status code and response envelope mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const UNAVAILABLE: &str = "UNAVAILABLE";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const MALFORMED_DOCUMENT: &str = "MALFORMED_DOCUMENT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Classified failure of a remote store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed document does not exist
    NotFound(String),
    /// The store rejected the caller's identity or rules
    PermissionDenied(String),
    /// The store could not be reached
    Unavailable(String),
    /// The call did not complete within the configured bound
    Timeout,
    /// A document could not be interpreted
    Malformed(String),
    /// Anything else the store reported
    Internal(String),
}

impl StoreError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => codes::NOT_FOUND,
            StoreError::PermissionDenied(_) => codes::PERMISSION_DENIED,
            StoreError::Unavailable(_) => codes::UNAVAILABLE,
            StoreError::Timeout => codes::TIMEOUT,
            StoreError::Malformed(_) => codes::MALFORMED_DOCUMENT,
            StoreError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            StoreError::NotFound(msg)
            | StoreError::PermissionDenied(msg)
            | StoreError::Unavailable(msg)
            | StoreError::Malformed(msg)
            | StoreError::Internal(msg) => msg.clone(),
            StoreError::Timeout => "remote call timed out".to_string(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Io(e) => StoreError::Unavailable(format!("I/O error: {}", e)),
            sqlx::Error::PoolClosed => StoreError::Unavailable("pool closed".to_string()),
            other => StoreError::Internal(format!("Database error: {}", other)),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(format!("JSON error: {}", err))
    }
}

impl From<tokio::time::error::Elapsed> for StoreError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        StoreError::Timeout
    }
}

/// Application error type for the HTTP adapter.
#[derive(Debug)]
pub enum AppError {
    /// Validation error
    Validation(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("View-model task failed: {:?}", err);
        AppError::Internal(format!("Operation aborted: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_includes_code() {
        let err = StoreError::NotFound("Document abc not found".to_string());
        assert_eq!(err.to_string(), "NOT_FOUND: Document abc not found");
        assert_eq!(StoreError::Timeout.to_string(), "TIMEOUT: remote call timed out");
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("x".into()).error_code(),
            codes::INTERNAL_ERROR
        );
    }
}
