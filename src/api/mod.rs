mod error;
mod tokens;
mod users;

use std::sync::Arc;

use axum::{Router, middleware};

use crate::auth::{AuthGate, authenticate};
use crate::db::UserStore;
use crate::rate_limit::LoginRateLimiter;
use crate::session::SessionManager;

pub use error::{ApiError, INVALID_CREDENTIALS, INVALID_REFRESH_TOKEN, MISSING_REFRESH_TOKEN};

/// State shared by the API handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub users: UserStore,
    pub login_limiter: Arc<LoginRateLimiter>,
}

/// Create the API router. Protected routes sit behind the request gate;
/// the session endpoints do not.
pub fn create_api_router(state: AppState, gate: AuthGate) -> Router {
    let protected = Router::new()
        .merge(tokens::protected_router(state.clone()))
        .merge(users::router(state.clone()))
        .route_layer(middleware::from_fn_with_state(gate, authenticate));

    Router::new()
        .merge(tokens::public_router(state))
        .merge(protected)
}
