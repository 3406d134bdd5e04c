// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use phoenix_users::config::Config;
use phoenix_users::db::{Database, FirestoreDb};
use phoenix_users::routes::create_router;
use phoenix_users::services::ImageHostService;
use phoenix_users::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by a fresh in-memory store and a mock image host.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

/// Same as `create_test_app` with a custom configuration.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        config,
        Database::in_memory(),
        ImageHostService::new_mock(),
    ));
    (create_router(state.clone()), state)
}

/// Send a request and return status plus parsed JSON body (`Null` if empty).
#[allow(dead_code)]
pub async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Build a JSON request, optionally with a bearer token.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a body-less request, optionally with a bearer token.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Sign up a user and return `(token, user_id)`.
#[allow(dead_code)]
pub async fn signup(app: &axum::Router, email: &str, password: &str) -> (String, String) {
    let body = serde_json::json!({
        "firstName": "Test",
        "lastName": "Test",
        "emailAddress": email,
        "password": password,
        "phoneNumber": "484-349-3949",
    });
    let (status, json) = send(app, json_request("POST", "/api/auth/signup", None, &body)).await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", json);

    let token = json["token"].as_str().unwrap().to_string();
    let id = json["user"]["id"].as_str().unwrap().to_string();
    (token, id)
}

/// Log in and return status plus body.
#[allow(dead_code)]
pub async fn login(app: &axum::Router, email: &str, password: &str) -> (StatusCode, Value) {
    let body = serde_json::json!({ "emailAddress": email, "password": password });
    send(app, json_request("POST", "/api/auth/login", None, &body)).await
}
