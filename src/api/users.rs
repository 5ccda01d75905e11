//! Account endpoints.
//!
//! - GET `/me` - The caller's identity
//! - POST `/password` - Change the caller's password and revoke their sessions
//! - DELETE `/admin/users/{username}` - Delete a user and their sessions
//! - DELETE `/admin/users/{username}/sessions` - Force-logout a user

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use super::error::{ApiError, INVALID_CREDENTIALS};
use crate::auth::{AdminOnly, Auth};
use crate::identity::{AuthenticatedIdentity, CredentialVerifier};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/password", post(change_password))
        .route("/admin/users/{username}", delete(delete_user))
        .route("/admin/users/{username}/sessions", delete(revoke_user_sessions))
        .with_state(state)
}

async fn me(Auth(identity, _): Auth) -> Json<AuthenticatedIdentity> {
    Json(identity)
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Serialize)]
struct RevokeResponse {
    revoked: u64,
}

/// Change the caller's password. Every session, including the caller's, is
/// revoked so other devices must log in again.
async fn change_password(
    State(state): State<AppState>,
    Auth(identity, _): Auth,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    if payload.new_password.is_empty() {
        return Err(ApiError::bad_request("New password must not be empty"));
    }

    let valid = state
        .users
        .verify_credentials(&identity.username, &payload.current_password)
        .await?;
    if !valid {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let revoked = state
        .users
        .set_password(&identity.username, &payload.new_password)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(username = %identity.username, revoked, "Password changed");
    Ok((StatusCode::OK, Json(RevokeResponse { revoked })))
}

/// Delete another user's account along with every session they hold.
async fn delete_user(
    State(state): State<AppState>,
    Auth(admin, _): Auth<AdminOnly>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.users.delete(&username).await? {
        return Err(ApiError::not_found("User not found"));
    }

    info!(admin = %admin.username, username = %username, "Admin deleted user");
    Ok(StatusCode::NO_CONTENT)
}

/// Force-logout every device of another user (e.g. after a password reset).
async fn revoke_user_sessions(
    State(state): State<AppState>,
    Auth(admin, _): Auth<AdminOnly>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state.sessions.logout_everywhere(&username).await?;
    info!(admin = %admin.username, username = %username, revoked, "Admin revoked sessions");
    Ok((StatusCode::OK, Json(RevokeResponse { revoked })))
}
