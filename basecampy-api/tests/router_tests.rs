//! Router behaviour that holds without a database
//!
//! The router runs over a lazy pool pointed at a closed port, so any request
//! that got as far as a query would fail; these stop earlier.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{offline_app, send};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_check_reports_degraded_database() {
    let app = offline_app();

    let response = send(&app, Method::GET, "/api/v1/healthcheck", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "degraded");
    assert_eq!(response.body["data"]["database"], "disconnected");
    assert!(response.body["data"].get("latency_ms").is_none());
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = offline_app();

    let response = send(&app, Method::GET, "/api/v1/healthcheck", None, None).await;

    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert!(response.headers.get("content-security-policy").is_some());
    // Not in production mode
    assert!(response.headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = offline_app();

    let response = send(&app, Method::GET, "/api/v1/nothing-here", None, None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["status_code"], 404);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["errors"], json!([]));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = offline_app();

    for (method, uri) in [
        (Method::GET, "/api/v1/project"),
        (Method::GET, "/api/v1/auth/current-user"),
        (Method::POST, "/api/v1/auth/logout"),
        (Method::GET, "/api/v1/task/00000000-0000-0000-0000-000000000000"),
        (Method::GET, "/api/v1/note/00000000-0000-0000-0000-000000000000"),
    ] {
        let response = send(&app, method.clone(), uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(response.body["success"], false);
    }
}

#[tokio::test]
async fn test_malformed_bearer_token_rejected() {
    let app = offline_app();

    let response = send(&app, Method::GET, "/api/v1/project", Some("not-a-jwt"), None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = offline_app();

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "not-an-email", "username": "ab", "password": "" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = response.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password", "username"]);
}

#[tokio::test]
async fn test_register_rejects_uppercase_username() {
    let app = offline_app();

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "alice@example.com", "username": "Alice", "password": "Str0ng!Passw0rd" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["errors"][0]["field"], "username");
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let app = offline_app();

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "alice@example.com", "username": "alice", "password": "password" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["errors"][0]["field"], "password");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = offline_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_without_token_rejected() {
    let app = offline_app();

    let response = send(&app, Method::POST, "/api/v1/auth/refresh-token", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/auth/refresh-token",
        None,
        Some(json!({ "refreshToken": "garbage" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_email_with_malformed_token() {
    let app = offline_app();

    let response = send(&app, Method::GET, "/api/v1/auth/verify-email/short", None, None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Token is invalid or expired");
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = offline_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/auth/login")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}
