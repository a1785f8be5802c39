// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::NaiveDate;
use pulse_tracker::config::Config;
use pulse_tracker::db::{FirestoreDb, HabitStore, MemoryDb};
use pulse_tracker::middleware::auth::create_session_jwt;
use pulse_tracker::routes::create_router;
use pulse_tracker::services::{
    MemoryBlobStore, MemoryIdentity, MemoryNotifier, MemoryTrigger, NativeTrigger,
    NotificationScheduler,
};
use pulse_tracker::time_utils::FixedClock;
use pulse_tracker::AppState;
use std::sync::Arc;

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
    FirestoreDb::new("test-project", "test-app")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// The date every test app believes is today (a Saturday).
#[allow(dead_code)]
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
}

/// A test app with in-memory backends and handles to inspect them.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub identity: Arc<MemoryIdentity>,
    pub blobs: Arc<MemoryBlobStore>,
    pub notifier: Arc<MemoryNotifier>,
    pub trigger: Option<Arc<MemoryTrigger>>,
}

/// Create a test app with in-process reminders only.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    build_test_app(false)
}

/// Create a test app whose reminders go through a native trigger.
#[allow(dead_code)]
pub fn create_test_app_with_trigger() -> TestApp {
    build_test_app(true)
}

fn build_test_app(with_trigger: bool) -> TestApp {
    let config = Config::test_default();
    let db = Arc::new(MemoryDb::new());
    let identity = Arc::new(MemoryIdentity::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let trigger = with_trigger.then(|| Arc::new(MemoryTrigger::new()));
    let clock = Arc::new(FixedClock::at(today(), 12, 0));

    let scheduler = NotificationScheduler::new(
        db.clone(),
        notifier.clone(),
        trigger.clone().map(|t| t as Arc<dyn NativeTrigger>),
        clock.clone(),
        config.default_reminder_time,
    );

    let state = Arc::new(AppState {
        config,
        db: db.clone(),
        identity: identity.clone(),
        blobs: blobs.clone(),
        scheduler,
        clock,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        identity,
        blobs,
        notifier,
        trigger,
    }
}

/// Session token for `uid`, signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, pin_unlocked: bool) -> String {
    create_session_jwt(uid, pin_unlocked, &Config::test_default().jwt_signing_key).unwrap()
}

/// Store a profile with a PIN already set up and return an unlocked token.
#[allow(dead_code)]
pub async fn unlocked_user(app: &TestApp, uid: &str) -> String {
    use pulse_tracker::models::UserProfile;
    use pulse_tracker::services::pin::hash_pin;

    let mut profile = UserProfile::new_default(
        uid,
        Some(&format!("{}@example.com", uid)),
        "2025-06-01T00:00:00Z".to_string(),
    );
    profile.pin = Some(hash_pin("123456", uid));
    profile.has_pin_setup = true;
    app.db.upsert_profile(&profile).await.unwrap();
    create_test_jwt(uid, true)
}

/// Build a JSON request with a bearer token.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a body-less request with a bearer token.
#[allow(dead_code)]
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Read a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
