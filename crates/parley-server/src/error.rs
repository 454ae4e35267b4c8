use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use parley_llm::error::LlmError;
use parley_store::error::StoreError;

/// Unified API error type for all route handlers.
///
/// Every variant maps to the structured envelope
/// `{"status":"error","error":{"type":..,"message":..}}` with a stable
/// type tag.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Forbidden(String),
    BadRequest(String),
    Unauthorized(String),
    RateLimited { message: String, retry_after: u64 },
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: &'static str,
    message: String,
}

/// Build the error envelope response shared by handlers and middleware.
pub fn error_response(status: StatusCode, error_type: &'static str, message: String) -> Response {
    (
        status,
        Json(ErrorBody {
            status: "error",
            error: ErrorDetail {
                error_type,
                message,
            },
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Forbidden(msg) => error_response(StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::BadRequest(msg) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
            }
            ApiError::Unauthorized(msg) => {
                error_response(StatusCode::UNAUTHORIZED, "authentication_error", msg)
            }
            ApiError::RateLimited {
                message,
                retry_after,
            } => {
                let mut response =
                    error_response(StatusCode::TOO_MANY_REQUESTS, "rate_limit", message);
                if let Ok(value) = retry_after.to_string().parse() {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred".to_string(),
                )
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConversationNotFound { .. } => {
                ApiError::NotFound("Conversation not found".to_string())
            }
            StoreError::Forbidden { .. } => {
                ApiError::Forbidden("You do not have access to this conversation".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
