//! Error types for Whale Sentinel

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Filesystem error (watch-list store)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Chain data backend error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors raised inside a chain data backend or price oracle.
///
/// These never cross the backend trait boundary: the trait layer logs them
/// and degrades to an empty or zero result.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Transport failure (timeout, connection refused, non-2xx)
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON-RPC error object returned by the node
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Explorer API returned a non-success status
    #[error("explorer: {0}")]
    Explorer(String),

    /// Typed contract call failed
    #[error("contract call: {0}")]
    Contract(String),

    /// Payload could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Error response structure for API
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_response) = match &self {
            AppError::Io(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    status: "error",
                    reason: "storage_error".to_string(),
                    details: Some(e.to_string()),
                },
            ),
            AppError::Json(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    status: "error",
                    reason: "serialization_error".to_string(),
                    details: Some(e.to_string()),
                },
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    status: "rejected",
                    reason: "validation_failed".to_string(),
                    details: Some(msg.clone()),
                },
            ),
            AppError::Backend(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    status: "error",
                    reason: "backend_error".to_string(),
                    details: Some(e.to_string()),
                },
            ),
        };

        tracing::error!(
            error_type = %self,
            status_code = %status_code,
            "Request error"
        );

        (status_code, Json(json!(error_response))).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Result type for backend internals
pub type BackendResult<T> = Result<T, BackendError>;
