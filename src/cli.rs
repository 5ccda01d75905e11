//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use crate::ServerConfig;
use crate::cleanup::DEFAULT_CLEANUP_INTERVAL;
use crate::db::Database;
use crate::jwt::DEFAULT_ACCESS_TOKEN_TTL;
use crate::rate_limit::{DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE, LoginRateLimiter};
use crate::session::{DEFAULT_REFRESH_TOKEN_TTL, DEFAULT_STORE_TIMEOUT};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "catalog-auth",
    about = "Session and bearer-token authentication for the catalog service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7300")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "catalog-auth.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TTL_SECS", default_value_t = DEFAULT_ACCESS_TOKEN_TTL.as_secs())]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TTL_SECS", default_value_t = DEFAULT_REFRESH_TOKEN_TTL.as_secs())]
    pub refresh_ttl_secs: u64,

    /// Upper bound on a single session store call, in milliseconds
    #[arg(long, default_value_t = DEFAULT_STORE_TIMEOUT.as_millis() as u64)]
    pub store_timeout_ms: u64,

    /// Login attempts allowed per username per minute
    #[arg(long, default_value_t = DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE)]
    pub login_attempts_per_minute: u32,

    /// Interval between expired-session sweeps, in seconds
    #[arg(long, default_value_t = DEFAULT_CLEANUP_INTERVAL.as_secs())]
    pub cleanup_interval_secs: u64,

    /// Create a user on startup. The password is read from CREATE_USER_PASSWORD
    #[arg(long)]
    pub create_user: Option<String>,

    /// Comma-separated roles for --create-user
    #[arg(long, default_value = "user")]
    pub create_user_roles: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(secret)
}

fn validate_jwt_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Handle the --create-user flag. Exits the process on failure.
pub async fn handle_create_user(db: &Database, username: &str, roles: &str) {
    let password = match std::env::var("CREATE_USER_PASSWORD") {
        Ok(password) if !password.is_empty() => {
            // SAFETY: still single-threaded startup, nothing else reads this variable.
            unsafe { std::env::remove_var("CREATE_USER_PASSWORD") };
            password
        }
        _ => {
            error!("--create-user requires the CREATE_USER_PASSWORD environment variable");
            std::process::exit(1);
        }
    };

    let roles: Vec<&str> = roles
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .collect();

    match db.users().create(username, &password, &roles).await {
        Ok(id) => info!(id, username = %username, roles = ?roles, "User created"),
        Err(e) => {
            error!(username = %username, error = %e, "Failed to create user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl: Duration::from_secs(args.access_ttl_secs),
        refresh_ttl: Duration::from_secs(args.refresh_ttl_secs),
        store_timeout: Duration::from_millis(args.store_timeout_ms),
        login_limiter: Arc::new(LoginRateLimiter::new(args.login_attempts_per_minute)),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str, acquire_timeout: Duration) -> Option<Database> {
    match Database::open_with_timeout(path, acquire_timeout).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
