// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Sign-up and login open a session and point the client at the PIN gate
//! 2. Protected routes reject requests without valid tokens
//! 3. The session cookie works in place of a bearer token
//! 4. CORS preflight and security headers are applied

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, create_test_jwt, get_request, json_request};

fn set_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_signup_creates_profile_and_session() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            None,
            json!({"username": "  jane  ", "email": "jane@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("pulse_session="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["next"], "pin_setup");
    assert_eq!(body["pinUnlocked"], false);
    let token = body["token"].as_str().unwrap().to_string();

    // The profile was created with the trimmed username
    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["username"], "jane");
    assert_eq!(me["email"], "jane@example.com");
    assert_eq!(me["hasPinSetup"], false);
}

#[tokio::test]
async fn test_signup_validation() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            None,
            json!({"username": "jane", "email": "not-an-email", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            None,
            json!({"username": "", "email": "jane@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_signup_reports_provider_message() {
    let app = create_test_app();
    let request = || {
        json_request(
            "POST",
            "/auth/signup",
            None,
            json!({"username": "jane", "email": "jane@example.com", "password": "hunter22"}),
        )
    };

    let first = app.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(second).await;
    assert_eq!(body["error"], "identity_error");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("Sign up failed: "));
}

#[tokio::test]
async fn test_login_and_wrong_password() {
    let app = create_test_app();
    app.router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            None,
            json!({"username": "jane", "email": "jane@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({"email": " jane@example.com ", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["next"], "pin_setup");

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({"email": "jane@example.com", "password": "wrong-one"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().starts_with("Login failed: "));
}

#[tokio::test]
async fn test_login_creates_missing_profile() {
    use pulse_tracker::db::HabitStore;
    use pulse_tracker::services::IdentityProvider;

    let app = create_test_app();
    // Account exists at the provider but has no profile document
    let identity = app
        .identity
        .sign_up("legacy@example.com", "hunter22")
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({"email": "legacy@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let profile = app.db.get_profile(&identity.uid).await.unwrap().unwrap();
    assert_eq!(profile.username, "legacy");
    assert!(!profile.has_pin_setup);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/auth/logout", None, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("pulse_session="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/me", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/stats", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/me", Some("invalid.token.here")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = create_test_app();
    let token = common::unlocked_user(&app, "user-cookie").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(header::COOKIE, format!("pulse_session={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["uid"], "user-cookie");
    assert_eq!(body["next"], "app");
    // No new token is minted for a plain session check
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_session_next_step_for_locked_session() {
    let app = create_test_app();
    common::unlocked_user(&app, "user-locked").await;
    let token = create_test_jwt("user-locked", false);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/auth/session", Some(&token)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["next"], "pin_unlock");
}

#[tokio::test]
async fn test_update_profile_theme() {
    let app = create_test_app();
    let token = common::unlocked_user(&app, "user-theme").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/me",
            Some(&token),
            json!({"theme": "dark"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["theme"], "dark");
    assert_eq!(body["username"], "user-theme");
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/journal/today")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_has_security_headers() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(get_request("/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}
