//! Session endpoints.
//!
//! - POST `/login` - Exchange credentials for an access/refresh pair
//! - POST `/refresh` - Rotate a refresh token into a new pair
//! - POST `/logout` - Revoke a refresh token
//! - GET `/sessions` - List the caller's live sessions
//! - POST `/sessions/revoke-all` - Revoke every session of the caller

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::AppState;
use super::error::ApiError;
use crate::auth::Auth;
use crate::jwt::unix_now;

/// Routes that do not require a bearer token.
pub fn public_router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Routes behind the request gate.
pub fn protected_router(state: AppState) -> Router {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/revoke-all", post(revoke_all))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct SessionInfo {
    id: i64,
    created_at: String,
    expires_at: u64,
}

#[derive(Serialize)]
struct ListSessionsResponse {
    sessions: Vec<SessionInfo>,
}

#[derive(Serialize)]
struct RevokeResponse {
    revoked: u64,
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    if !state.login_limiter.check(&payload.username) {
        warn!(username = %payload.username, "Login rate limit exceeded");
        return Err(ApiError::too_many_requests(
            "Too many authentication attempts. Please wait before trying again.",
        ));
    }

    let pair = state
        .sessions
        .login(&payload.username, &payload.password, unix_now())
        .await?;

    Ok((StatusCode::OK, Json(pair)))
}

async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let token = payload.refresh_token.unwrap_or_default();
    let pair = state.sessions.refresh(&token, unix_now()).await?;
    Ok((StatusCode::OK, Json(pair)))
}

/// A missing or unreadable body carries no token, so it is a no-op logout.
async fn logout(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let token = payload
        .ok()
        .and_then(|Json(payload)| payload.refresh_token)
        .unwrap_or_default();
    state.sessions.logout(&token).await?;
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Logged out",
        }),
    ))
}

/// List the caller's live sessions. Token strings are never returned.
async fn list_sessions(
    State(state): State<AppState>,
    Auth(identity, _): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state
        .sessions
        .list_sessions(&identity.username, unix_now())
        .await?;

    let sessions = sessions
        .into_iter()
        .map(|s| SessionInfo {
            id: s.id,
            created_at: s.created_at,
            expires_at: s.expires_at,
        })
        .collect();

    Ok((StatusCode::OK, Json(ListSessionsResponse { sessions })))
}

/// Log the caller out of every device.
async fn revoke_all(
    State(state): State<AppState>,
    Auth(identity, _): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state.sessions.logout_everywhere(&identity.username).await?;
    Ok((StatusCode::OK, Json(RevokeResponse { revoked })))
}
