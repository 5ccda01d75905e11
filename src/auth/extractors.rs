//! Axum extractors for the identity attached by the request gate.

use std::convert::Infallible;
use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::AuthError;
use crate::identity::AuthenticatedIdentity;

/// Role requirement checked by [`Auth`].
pub trait RoleConstraint {
    /// Role the identity must carry, or `None` for any authenticated identity.
    const ROLE: Option<&'static str>;
}

/// Any authenticated identity.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    const ROLE: Option<&'static str> = None;
}

/// Identities carrying the `admin` role.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    const ROLE: Option<&'static str> = Some("admin");
}

/// Extractor for handlers that require an authenticated identity.
pub struct Auth<R: RoleConstraint = AnyRole>(pub AuthenticatedIdentity, pub PhantomData<R>);

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: Send + Sync,
    R: RoleConstraint,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .ok_or(AuthError::NotAuthenticated)?;

        if let Some(role) = R::ROLE {
            if !identity.has_role(role) {
                return Err(AuthError::InsufficientRole);
            }
        }

        Ok(Auth(identity, PhantomData))
    }
}

/// Optional authentication extractor - never fails.
pub struct OptionalAuth(pub Option<AuthenticatedIdentity>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(
            parts.extensions.get::<AuthenticatedIdentity>().cloned(),
        ))
    }
}
