#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use catalog_auth::{ServerConfig, create_app, db::Database, rate_limit::LoginRateLimiter};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-of-at-least-32-bytes";
pub const ACCESS_TTL: Duration = Duration::from_secs(900);
pub const ALICE_PASSWORD: &str = "correct horse battery staple";
pub const ROOT_PASSWORD: &str = "root-password";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
}

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: TEST_SECRET.to_vec(),
        access_ttl: ACCESS_TTL,
        refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        store_timeout: Duration::from_secs(2),
        login_limiter: Arc::new(LoginRateLimiter::new(10)),
    }
}

/// Seed `alice` (user) and `root` (admin) into `db` and build the app on it.
pub async fn create_test_app_with_db(db: Database) -> TestApp {
    db.users()
        .create("alice", ALICE_PASSWORD, &["user"])
        .await
        .expect("Failed to create alice");
    db.users()
        .create("root", ROOT_PASSWORD, &["user", "admin"])
        .await
        .expect("Failed to create root");

    let app = create_app(&test_config(db.clone()));
    TestApp { app, db }
}

pub async fn create_test_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    create_test_app_with_db(db).await
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Send a request and return the status with the parsed JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Log in and return the token pair body. Panics if login fails.
pub async fn login(app: &Router, username: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/login",
            serde_json::json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body
}
