//! API error type and JSON error bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use sentio_chat::ChatError;
use sentio_storage::AccountError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. "bad_request").
    pub error: String,
    pub message: String,
}

/// Errors returned by handlers, mapped to HTTP status codes.
#[derive(Debug)]
pub enum ApiError {
    /// 400 - invalid input.
    BadRequest(String),
    /// 401 - credentials did not match.
    Unauthorized(String),
    /// 404 - no such resource.
    NotFound(String),
    /// 409 - resource already exists.
    Conflict(String),
    /// 500 - unexpected server error.
    Internal(String),
    /// 503 - feature switched off or backend down.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidEmail | AccountError::InvalidPassword(_) => {
                ApiError::BadRequest(err.to_string())
            }
            AccountError::AlreadyRegistered => ApiError::Conflict(err.to_string()),
            AccountError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AccountError::InvalidPattern(_) | AccountError::Storage(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) | ChatError::MissingUser => {
                ApiError::BadRequest(err.to_string())
            }
            ChatError::NoSession => ApiError::NotFound(err.to_string()),
            ChatError::Disabled => ApiError::ServiceUnavailable(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
