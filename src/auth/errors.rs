//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Rejections produced by the request gate and the auth extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No identity on the request and the route requires one.
    NotAuthenticated,
    /// Bearer token failed signature, format or expiry checks.
    InvalidOrExpiredAccessToken,
    /// Token verified but the subject could not be resolved.
    IdentityResolutionFailure,
    InsufficientRole,
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotAuthenticated
            | AuthError::InvalidOrExpiredAccessToken
            | AuthError::IdentityResolutionFailure => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "Not authenticated",
            AuthError::InvalidOrExpiredAccessToken => "Invalid or expired token",
            AuthError::IdentityResolutionFailure => "Unable to resolve identity",
            AuthError::InsufficientRole => "Insufficient permissions",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
