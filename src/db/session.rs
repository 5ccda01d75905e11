//! Refresh token storage.
//!
//! Refresh tokens are opaque random strings; the row is the only source of
//! truth for whether a session is alive. Access tokens are never stored.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use super::{StoreError, to_db_time};

/// Random bytes per refresh token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// A refresh token record.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: i64,
    pub token: String,
    pub username: String,
    pub expires_at: u64,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    token: String,
    username: String,
    expires_at: i64,
    created_at: String,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            token: row.token,
            username: row.username,
            expires_at: u64::try_from(row.expires_at).unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

/// Outcome of a successful rotation: the owner and the replacement token.
#[derive(Debug, Clone)]
pub struct Rotation {
    pub username: String,
    pub token: String,
}

/// Store for refresh token sessions.
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a session for `username` expiring `ttl` after `now`. Returns the token string.
    pub async fn create(
        &self,
        username: &str,
        ttl: Duration,
        now: u64,
    ) -> Result<String, StoreError> {
        let token = generate_token();
        sqlx::query("INSERT INTO refresh_tokens (token, username, expires_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(username)
            .bind(to_db_time(now.saturating_add(ttl.as_secs())))
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    /// Look up a live session. An expired row is deleted and reported as absent.
    pub async fn find_valid(
        &self,
        token: &str,
        now: u64,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, token, username, expires_at, created_at FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!("Refresh token not found");
            return Ok(None);
        };

        if row.expires_at <= to_db_time(now) {
            sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
                .bind(row.id)
                .execute(&self.pool)
                .await?;
            debug!(username = %row.username, "Refresh token expired, removed");
            return Ok(None);
        }

        Ok(Some(row.into()))
    }

    /// Consume `token` and issue its replacement in one transaction.
    ///
    /// The old row is claimed with a single `DELETE ... RETURNING`, so of any
    /// number of concurrent callers presenting the same token at most one gets
    /// `Some`. An expired token is consumed and reported as absent.
    pub async fn rotate(
        &self,
        token: &str,
        ttl: Duration,
        now: u64,
    ) -> Result<Option<Rotation>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let claimed: Option<(String, i64)> = sqlx::query_as(
            "DELETE FROM refresh_tokens WHERE token = ? RETURNING username, expires_at",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((username, expires_at)) = claimed else {
            tx.rollback().await?;
            debug!("Refresh token not found for rotation");
            return Ok(None);
        };

        if expires_at <= to_db_time(now) {
            tx.commit().await?;
            debug!(username = %username, "Refresh token expired, removed");
            return Ok(None);
        }

        let replacement = generate_token();
        sqlx::query("INSERT INTO refresh_tokens (token, username, expires_at) VALUES (?, ?, ?)")
            .bind(&replacement)
            .bind(&username)
            .bind(to_db_time(now.saturating_add(ttl.as_secs())))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(Rotation {
            username,
            token: replacement,
        }))
    }

    /// Delete a session by token. Returns whether a row was removed.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session owned by `username` (logout everywhere).
    pub async fn delete_by_identity(&self, username: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List live sessions for `username`, newest first.
    pub async fn list_by_identity(
        &self,
        username: &str,
        now: u64,
    ) -> Result<Vec<RefreshToken>, StoreError> {
        let rows: Vec<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, token, username, expires_at, created_at FROM refresh_tokens
             WHERE username = ? AND expires_at > ? ORDER BY id DESC",
        )
        .bind(username)
        .bind(to_db_time(now))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RefreshToken::from).collect())
    }

    /// Delete all expired sessions.
    pub async fn delete_expired(&self, now: u64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(to_db_time(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
