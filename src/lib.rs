pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod identity;
pub mod jwt;
pub mod rate_limit;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api::{AppState, create_api_router};
use auth::AuthGate;
use axum::Router;
use db::Database;
use jwt::JwtConfig;
use rate_limit::LoginRateLimiter;
use session::SessionManager;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// Upper bound on a single session store or identity lookup
    pub store_timeout: Duration,
    /// Per-username login limiter, shared with the cleanup scheduler
    pub login_limiter: Arc<LoginRateLimiter>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret, config.access_ttl));
    let users = Arc::new(config.db.users());

    let sessions = SessionManager::new(
        jwt.clone(),
        config.db.sessions(),
        users.clone(),
        config.refresh_ttl,
        config.store_timeout,
    );

    let state = AppState {
        sessions,
        users: config.db.users(),
        login_limiter: config.login_limiter.clone(),
    };
    let gate = AuthGate::new(jwt, users, config.store_timeout);

    create_api_router(state, gate)
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(config: &ServerConfig, interval: Duration) {
    cleanup::run_cleanup(&config.db, &config.login_limiter).await;
    cleanup::spawn_cleanup_scheduler(config.db.clone(), config.login_limiter.clone(), interval);
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
