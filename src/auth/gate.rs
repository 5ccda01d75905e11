//! Per-request bearer authentication middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::bearer::bearer_token;
use super::state::AuthGate;
use crate::identity::AuthenticatedIdentity;
use crate::jwt::unix_now;

/// Attach an `AuthenticatedIdentity` to the request when a valid bearer token
/// is present.
///
/// Requests without a bearer credential pass through anonymously and are left
/// to the route's extractors to reject. A bearer token that fails verification
/// short-circuits with 401 before the handler runs, even when an earlier layer
/// already attached an identity. That earlier identity is never replaced.
pub async fn authenticate(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        return next.run(request).await;
    };

    let identity = match gate.authenticate_token(&token, unix_now()).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    if request.extensions().get::<AuthenticatedIdentity>().is_none() {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}
