//! Seams to the external user-credential store.
//!
//! Password checking and role lookup are owned by whatever holds the user
//! records. The session core only consumes them through these traits.

use async_trait::async_trait;
use serde::Serialize;

use crate::db::StoreError;

/// The principal attached to a request after the bearer token verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub username: String,
    pub roles: Vec<String>,
}

impl AuthenticatedIdentity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Checks a username/password pair.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns `Ok(false)` both for an unknown user and for a wrong password.
    async fn verify_credentials(&self, username: &str, password: &str)
    -> Result<bool, StoreError>;
}

/// Resolves authorization attributes for a verified subject.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns `Ok(None)` when the subject no longer exists.
    async fn resolve(&self, username: &str) -> Result<Option<AuthenticatedIdentity>, StoreError>;
}
