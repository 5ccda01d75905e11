//! Session lifecycle: login, refresh with rotation, logout.
//!
//! Every store call is bounded by `store_timeout`. A store that does not
//! answer in time is an outage (`SessionError::Store`), never an auth failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{RefreshToken, SessionStore, StoreError};
use crate::identity::CredentialVerifier;
use crate::jwt::{JwtConfig, TokenError};

/// Default refresh token lifetime: 7 days
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default bound on a single store operation.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Access + refresh pair handed to the client.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing refresh token")]
    MissingRefreshToken,
    #[error("invalid or expired refresh token")]
    InvalidOrExpiredRefreshToken,
    #[error("session store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("failed to issue access token: {0}")]
    Token(#[from] TokenError),
}

/// Orchestrates the credential verifier, token codec and session store.
#[derive(Clone)]
pub struct SessionManager {
    jwt: Arc<JwtConfig>,
    sessions: SessionStore,
    credentials: Arc<dyn CredentialVerifier>,
    refresh_ttl: Duration,
    store_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        jwt: Arc<JwtConfig>,
        sessions: SessionStore,
        credentials: Arc<dyn CredentialVerifier>,
        refresh_ttl: Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            jwt,
            sessions,
            credentials,
            refresh_ttl,
            store_timeout,
        }
    }

    /// Verify credentials and open a new session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        now: u64,
    ) -> Result<TokenPair, SessionError> {
        let valid = self
            .bounded(self.credentials.verify_credentials(username, password))
            .await?;
        if !valid {
            info!(username = %username, "Login rejected");
            return Err(SessionError::InvalidCredentials);
        }

        let access = self.jwt.issue(username, now)?;
        let refresh_token = self
            .bounded(self.sessions.create(username, self.refresh_ttl, now))
            .await?;

        info!(username = %username, "Login succeeded");
        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: access.duration,
        })
    }

    /// Exchange a refresh token for a new pair. The presented token is consumed.
    pub async fn refresh(&self, refresh_token: &str, now: u64) -> Result<TokenPair, SessionError> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(SessionError::MissingRefreshToken);
        }

        let rotation = self
            .bounded(self.sessions.rotate(refresh_token, self.refresh_ttl, now))
            .await?
            .ok_or_else(|| {
                debug!("Refresh rejected");
                SessionError::InvalidOrExpiredRefreshToken
            })?;

        let access = self.jwt.issue(&rotation.username, now)?;

        debug!(username = %rotation.username, "Refresh token rotated");
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: rotation.token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: access.duration,
        })
    }

    /// End a session. Succeeds whether or not the token was live.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Ok(());
        }

        let removed = self
            .bounded(self.sessions.delete_by_token(refresh_token))
            .await?;
        debug!(removed, "Logout");
        Ok(())
    }

    /// End every session owned by `username`. Returns how many were removed.
    pub async fn logout_everywhere(&self, username: &str) -> Result<u64, SessionError> {
        let removed = self
            .bounded(self.sessions.delete_by_identity(username))
            .await?;
        info!(username = %username, removed, "Revoked all sessions");
        Ok(removed)
    }

    /// Live sessions owned by `username`, newest first.
    pub async fn list_sessions(
        &self,
        username: &str,
        now: u64,
    ) -> Result<Vec<RefreshToken>, SessionError> {
        self.bounded(self.sessions.list_by_identity(username, now))
            .await
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result.map_err(|e| {
                warn!(error = %e, "Session store error");
                SessionError::Store(e)
            }),
            Err(_) => {
                warn!(timeout_ms = self.store_timeout.as_millis() as u64, "Session store timed out");
                Err(SessionError::Store(StoreError::Timeout))
            }
        }
    }
}
