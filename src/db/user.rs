use std::sync::LazyLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use super::StoreError;
use crate::identity::{AuthenticatedIdentity, CredentialVerifier, IdentityResolver};

/// Hash checked when the username is unknown, so the miss costs the same as a
/// wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("dummy-password-for-timing").ok());

/// Reference credential store backed by the `users` table.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub roles: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    roles: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            roles: parse_roles(&row.roles),
        }
    }
}

fn parse_roles(roles: &str) -> Vec<String> {
    roles
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user with an argon2id hash of `password`. Returns the user ID.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        roles: &[&str],
    ) -> Result<i64, StoreError> {
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| StoreError::PasswordHash(e.to_string()))??;

        let result =
            sqlx::query("INSERT INTO users (username, password_hash, roles) VALUES (?, ?, ?)")
                .bind(username)
                .bind(&password_hash)
                .bind(roles.join(","))
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT username, roles FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Replace a user's password and revoke every session they hold, in one
    /// transaction. Returns the number of revoked sessions, or `None` when the
    /// user does not exist.
    pub async fn set_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<u64>, StoreError> {
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| StoreError::PasswordHash(e.to_string()))??;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE users SET password_hash = ? WHERE username = ?")
            .bind(&password_hash)
            .bind(username)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let revoked = sqlx::query("DELETE FROM refresh_tokens WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(revoked.rows_affected()))
    }

    /// Delete a user and their sessions. Returns whether the user existed.
    pub async fn delete(&self, username: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CredentialVerifier for UserStore {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, StoreError> {
        let stored: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        let exists = stored.is_some();
        let hash = match stored {
            Some((hash,)) => Some(hash),
            None => DUMMY_HASH.clone(),
        };
        let Some(hash) = hash else {
            return Ok(false);
        };

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
            .await
            .map_err(|e| StoreError::PasswordHash(e.to_string()))?;

        Ok(exists && matches)
    }
}

#[async_trait]
impl IdentityResolver for UserStore {
    async fn resolve(&self, username: &str) -> Result<Option<AuthenticatedIdentity>, StoreError> {
        Ok(self
            .get_by_username(username)
            .await?
            .map(|user| AuthenticatedIdentity {
                username: user.username,
                roles: user.roles,
            }))
    }
}
