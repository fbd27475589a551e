//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::gateway::GatewayError;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation error.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The voice server control endpoint is unreachable.
    #[error("Voice server unavailable")]
    GatewayUnavailable,

    /// A voice server operation failed.
    #[error("Voice server operation failed")]
    Gateway,

    /// Internal server error.
    #[error("Internal server error")]
    Internal,
}

/// Error response body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::GatewayUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "GATEWAY_UNAVAILABLE"),
            Self::Gateway => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

// Detail stays in the log; clients get the generic variant message.
impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        error!(error = %e, "gateway call failed");
        match e {
            GatewayError::InvalidUsername(message) => Self::Validation(message),
            GatewayError::NotFound(what) => Self::NotFound(what),
            e if e.is_connection_error() => Self::GatewayUnavailable,
            _ => Self::Gateway,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = %e, "internal error");
        Self::Internal
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        error!(error = %e, "database error");
        Self::Internal
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
