// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily reminder settings and Cloud Tasks callback tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use pulse_tracker::config::Config;
use pulse_tracker::db::HabitStore;
use pulse_tracker::middleware::auth::create_reminder_token;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{
    body_json, create_test_app, create_test_app_with_trigger, create_test_jwt, get_request,
    json_request, unlocked_user, TestApp,
};

const UID: &str = "user-remind";

fn reminder_token(uid: &str, task: &str) -> String {
    create_reminder_token(
        uid,
        task,
        &Config::test_default().jwt_signing_key,
        Utc::now() + Duration::hours(1),
    )
    .unwrap()
}

fn callback(uid: &str, task: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/tasks/send-reminder")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-cloudtasks-queuename", "daily-reminders");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(json!({ "uid": uid, "task": task }).to_string()))
        .unwrap()
}

async fn current_task(app: &TestApp) -> String {
    app.state
        .scheduler
        .settings(UID)
        .await
        .unwrap()
        .native_task_name
        .unwrap()
}

async fn put_settings(app: &TestApp, token: &str, body: serde_json::Value) -> axum::response::Response {
    app.router
        .clone()
        .oneshot(json_request("PUT", "/api/notifications", Some(token), body))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_defaults_before_enabling() {
    let app = create_test_app();
    let token = unlocked_user(&app, UID).await;

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/notifications", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["enabled"], false);
    assert_eq!(body["time"], "20:00");
    assert_eq!(body["schedule"]["state"], "disabled");
    assert_eq!(body["nativeAvailable"], false);
    assert!(body["lastFiredDate"].is_null());
}

#[tokio::test]
async fn test_enable_and_disable_in_process() {
    let app = create_test_app();
    let token = unlocked_user(&app, UID).await;

    let response = put_settings(&app, &token, json!({"enabled": true, "time": "21:30"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["enabled"], true);
    assert_eq!(body["time"], "21:30");
    assert_eq!(body["schedule"]["state"], "scheduled-fallback");
    assert_eq!(body["schedule"]["nextFire"], "2025-06-14T21:30:00");
    assert!(app.state.scheduler.has_pending(UID));

    let stored = app
        .db
        .get_notification_settings(UID)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.enabled);
    assert_eq!(stored.time.to_string(), "21:30");

    let response = put_settings(&app, &token, json!({"enabled": false})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["enabled"], false);
    assert_eq!(body["schedule"]["state"], "disabled");
    // The chosen time is kept for next time
    assert_eq!(body["time"], "21:30");
    assert!(!app.state.scheduler.has_pending(UID));
}

#[tokio::test]
async fn test_invalid_time_rejected() {
    let app = create_test_app();
    let token = unlocked_user(&app, UID).await;

    let response = put_settings(&app, &token, json!({"enabled": true, "time": "25:61"})).await;
    assert!(response.status().is_client_error());
    assert!(!app.state.scheduler.has_pending(UID));
}

#[tokio::test]
async fn test_permission_denied() {
    let app = create_test_app();
    let token = unlocked_user(&app, UID).await;
    app.notifier.set_permission_denied(true);

    let response = put_settings(&app, &token, json!({"enabled": true})).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "notification_error");
    assert!(!app.state.scheduler.has_pending(UID));

    let settings = app.state.scheduler.settings(UID).await.unwrap();
    assert!(!settings.enabled);
}

#[tokio::test]
async fn test_native_trigger_round_trip() {
    let app = create_test_app_with_trigger();
    let trigger = app.trigger.clone().unwrap();
    let token = unlocked_user(&app, UID).await;

    let response = put_settings(&app, &token, json!({"enabled": true})).await;
    let body = body_json(response).await;
    assert_eq!(body["nativeAvailable"], true);
    assert_eq!(body["schedule"]["state"], "scheduled-native");
    assert_eq!(trigger.pending().len(), 1);
    assert_eq!(trigger.pending()[0].0, UID);

    // Cloud Tasks calls back at the scheduled time
    let task = current_task(&app).await;
    let response = app
        .router
        .clone()
        .oneshot(callback(UID, &task, Some(&reminder_token(UID, &task))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["delivered"], true);
    assert_eq!(app.notifier.deliveries(), vec![UID.to_string()]);

    // The next trigger was queued in place of the one that fired
    let next = current_task(&app).await;
    assert_ne!(next, task);
    assert_eq!(trigger.pending().len(), 1);
    let settings = app.state.scheduler.settings(UID).await.unwrap();
    assert_eq!(settings.last_fired_date.as_deref(), Some("2025-06-14"));

    // A queue retry of the same task is acknowledged but does nothing
    let response = app
        .router
        .clone()
        .oneshot(callback(UID, &task, Some(&reminder_token(UID, &task))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["delivered"], false);
    assert_eq!(app.notifier.deliveries().len(), 1);
    assert_eq!(trigger.pending().len(), 1);
    assert_eq!(current_task(&app).await, next);

    // Disabling cancels the queued trigger
    put_settings(&app, &token, json!({"enabled": false})).await;
    assert!(trigger.pending().is_empty());
}

#[tokio::test]
async fn test_replaced_task_callback_is_ignored() {
    let app = create_test_app_with_trigger();
    let trigger = app.trigger.clone().unwrap();
    let token = unlocked_user(&app, UID).await;

    put_settings(&app, &token, json!({"enabled": true, "time": "20:00"})).await;
    let replaced = current_task(&app).await;
    put_settings(&app, &token, json!({"enabled": true, "time": "21:00"})).await;
    let current = current_task(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(callback(UID, &replaced, Some(&reminder_token(UID, &replaced))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["delivered"], false);
    assert!(app.notifier.deliveries().is_empty());
    assert_eq!(trigger.pending().len(), 1);
    assert_eq!(current_task(&app).await, current);
}

#[tokio::test]
async fn test_callback_after_disable_delivers_nothing() {
    let app = create_test_app_with_trigger();
    let token = unlocked_user(&app, UID).await;
    put_settings(&app, &token, json!({"enabled": true})).await;
    let task = current_task(&app).await;
    put_settings(&app, &token, json!({"enabled": false})).await;

    let response = app
        .router
        .clone()
        .oneshot(callback(UID, &task, Some(&reminder_token(UID, &task))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["delivered"], false);
    assert!(app.notifier.deliveries().is_empty());
    assert!(app.trigger.clone().unwrap().pending().is_empty());
}

#[tokio::test]
async fn test_callback_without_token_unauthorized() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(callback(UID, "t1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_rejects_session_token() {
    let app = create_test_app();
    let session = create_test_jwt(UID, true);

    let response = app
        .router
        .clone()
        .oneshot(callback(UID, "t1", Some(&session)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_callback_rejects_other_users_token() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(callback(UID, "t1", Some(&reminder_token("someone-else", "t1"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.notifier.deliveries().is_empty());
}

#[tokio::test]
async fn test_callback_rejects_token_for_other_task() {
    let app = create_test_app_with_trigger();
    let token = unlocked_user(&app, UID).await;
    put_settings(&app, &token, json!({"enabled": true})).await;
    let task = current_task(&app).await;

    // A token minted for one task cannot be replayed for another.
    let response = app
        .router
        .clone()
        .oneshot(callback(UID, &task, Some(&reminder_token(UID, "older-task"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.notifier.deliveries().is_empty());
    assert_eq!(current_task(&app).await, task);
}
