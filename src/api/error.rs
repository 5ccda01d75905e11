//! Shared error handling for API endpoints.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::db::StoreError;
use crate::session::SessionError;

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    TooManyRequests(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::TooManyRequests(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }
}

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const MISSING_REFRESH_TOKEN: &str = "Missing refresh token";
pub const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidCredentials => ApiError::unauthorized(INVALID_CREDENTIALS),
            SessionError::MissingRefreshToken => ApiError::bad_request(MISSING_REFRESH_TOKEN),
            SessionError::InvalidOrExpiredRefreshToken => {
                ApiError::unauthorized(INVALID_REFRESH_TOKEN)
            }
            // Already logged where the store call was bounded
            SessionError::Store(_) => ApiError::service_unavailable("Session store unavailable"),
            SessionError::Token(e) => {
                error!(error = %e, "Failed to issue access token");
                ApiError::internal("Failed to issue token")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "Store error");
        ApiError::service_unavailable("Store unavailable")
    }
}

/// Malformed or missing JSON bodies get the same error shape as every other
/// failure instead of axum's plain-text rejection.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection, "Rejected request body");
        ApiError::bad_request(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error"),
            message,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
