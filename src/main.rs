use std::time::Duration;

use catalog_auth::cli::{
    Args, build_config, handle_create_user, init_logging, load_jwt_secret, open_database,
};
use catalog_auth::{init_cleanup, run_server};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let store_timeout = Duration::from_millis(args.store_timeout_ms);
    let Some(db) = open_database(&args.database, store_timeout).await else {
        std::process::exit(1);
    };

    if let Some(username) = args.create_user.as_deref() {
        handle_create_user(&db, username, &args.create_user_roles).await;
    }

    let config = build_config(&args, db, jwt_secret);
    init_cleanup(&config, Duration::from_secs(args.cleanup_interval_secs)).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
