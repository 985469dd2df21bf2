//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use nestly_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Error returned by handlers and extractors.
#[derive(Debug)]
pub enum ApiError {
    /// No identity was attached to the request.
    Unauthorized(String),
    /// A domain error.
    App(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
            Self::App(err) => {
                let (status, code) = match err.kind {
                    ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
                    ErrorKind::Timeout => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
                    ErrorKind::ServiceUnavailable | ErrorKind::ExternalService => {
                        (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
                    }
                    ErrorKind::Database
                    | ErrorKind::Serialization
                    | ErrorKind::Configuration
                    | ErrorKind::Internal => {
                        tracing::error!(error = %err, "Internal server error");
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    }
                };
                (status, code, err.message)
            }
        };

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
