//! Scheduled sweep of expired sessions and idle rate limiter entries.
//!
//! Expired refresh tokens are already treated as absent on lookup; the sweep
//! only keeps the table and the limiter's key map from growing.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::db::Database;
use crate::jwt::unix_now;
use crate::rate_limit::LoginRateLimiter;

/// Default interval between cleanup runs.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database, login_limiter: &LoginRateLimiter) {
    match db.sessions().delete_expired(unix_now()).await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired sessions", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired sessions: {}", e),
    }

    login_limiter.prune();
    debug!(
        tracked = login_limiter.tracked_keys(),
        "Pruned login rate limiter"
    );
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(
    db: Database,
    login_limiter: Arc<LoginRateLimiter>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);

        loop {
            interval.tick().await;
            run_cleanup(&db, &login_limiter).await;
        }
    })
}
