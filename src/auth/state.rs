//! State consumed by the request gate.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::errors::AuthError;
use crate::identity::{AuthenticatedIdentity, IdentityResolver};
use crate::jwt::JwtConfig;

/// Everything the gate needs to turn a bearer token into an identity.
#[derive(Clone)]
pub struct AuthGate {
    jwt: Arc<JwtConfig>,
    identities: Arc<dyn IdentityResolver>,
    resolve_timeout: Duration,
}

impl AuthGate {
    pub fn new(
        jwt: Arc<JwtConfig>,
        identities: Arc<dyn IdentityResolver>,
        resolve_timeout: Duration,
    ) -> Self {
        Self {
            jwt,
            identities,
            resolve_timeout,
        }
    }

    /// Verify `token` at `now` and resolve its subject.
    pub async fn authenticate_token(
        &self,
        token: &str,
        now: u64,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let claims = self.jwt.verify(token, now).map_err(|e| {
            debug!(reason = %e, "Access token rejected");
            AuthError::InvalidOrExpiredAccessToken
        })?;

        match tokio::time::timeout(self.resolve_timeout, self.identities.resolve(&claims.sub)).await
        {
            Ok(Ok(Some(identity))) => Ok(identity),
            Ok(Ok(None)) => {
                warn!(username = %claims.sub, "Token subject no longer exists");
                Err(AuthError::IdentityResolutionFailure)
            }
            Ok(Err(e)) => {
                error!(username = %claims.sub, error = %e, "Failed to resolve identity");
                Err(AuthError::IdentityResolutionFailure)
            }
            Err(_) => {
                error!(username = %claims.sub, "Identity resolution timed out");
                Err(AuthError::IdentityResolutionFailure)
            }
        }
    }
}
