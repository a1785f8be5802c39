// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Extension, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_jwt, removal_cookie, session_cookie, AuthUser};
use crate::models::UserProfile;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Routes that need a session (layered in routes/mod.rs).
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/session", get(session))
}

/// Where the client should go after a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    PinSetup,
    PinUnlock,
    App,
}

impl NextStep {
    pub fn for_session(has_pin_setup: bool, pin_unlocked: bool) -> Self {
        match (has_pin_setup, pin_unlocked) {
            (false, _) => NextStep::PinSetup,
            (true, false) => NextStep::PinUnlock,
            (true, true) => NextStep::App,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub uid: String,
    pub pin_unlocked: bool,
    pub next: NextStep,
    /// Present when a new session token was issued, for bearer-token clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Issue a session token and set it as the session cookie.
pub(crate) fn issue_session(
    state: &AppState,
    jar: CookieJar,
    profile: &UserProfile,
    pin_unlocked: bool,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = create_session_jwt(&profile.uid, pin_unlocked, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let jar = jar.add(session_cookie(token.clone(), state.config.secure_cookies()));
    Ok((
        jar,
        Json(SessionResponse {
            uid: profile.uid.clone(),
            pin_unlocked,
            next: NextStep::for_session(profile.has_pin_setup, pin_unlocked),
            token: Some(token),
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Create an account and its profile, then open a session.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<SignUpRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let req = SignUpRequest {
        username: req.username.trim().to_string(),
        email: req.email.trim().to_string(),
        password: req.password,
    };
    req.validate()?;

    let identity = state
        .identity
        .sign_up(&req.email, &req.password)
        .await
        .map_err(|e| match e {
            AppError::Identity(msg) => AppError::Identity(format!("Sign up failed: {}", msg)),
            other => other,
        })?;

    let profile = UserProfile {
        username: req.username,
        ..UserProfile::new_default(
            &identity.uid,
            identity.email.as_deref().or(Some(req.email.as_str())),
            format_utc_rfc3339(chrono::Utc::now()),
        )
    };
    state.db.upsert_profile(&profile).await?;

    tracing::info!(uid = %profile.uid, "Account created");
    issue_session(&state, jar, &profile, false)
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Sign in, creating a default profile if the account has none.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let req = LoginRequest {
        email: req.email.trim().to_string(),
        password: req.password,
    };
    req.validate()?;

    let identity = state
        .identity
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| match e {
            AppError::Identity(msg) => AppError::Identity(format!("Login failed: {}", msg)),
            other => other,
        })?;

    let profile = match state.db.get_profile(&identity.uid).await? {
        Some(profile) => profile,
        None => {
            let profile = UserProfile::new_default(
                &identity.uid,
                identity.email.as_deref(),
                format_utc_rfc3339(chrono::Utc::now()),
            );
            state.db.upsert_profile(&profile).await?;
            tracing::info!(uid = %profile.uid, "Created missing profile at login");
            profile
        }
    };

    tracing::info!(uid = %profile.uid, "Signed in");
    issue_session(&state, jar, &profile, false)
}

/// Clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.add(removal_cookie(state.config.secure_cookies())),
        StatusCode::NO_CONTENT,
    )
}

/// Report the current session and the screen the client should show.
async fn session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SessionResponse>> {
    let has_pin_setup = state
        .db
        .get_profile(&user.uid)
        .await?
        .is_some_and(|p| p.has_pin_setup);

    Ok(Json(SessionResponse {
        uid: user.uid,
        pin_unlocked: user.pin_unlocked,
        next: NextStep::for_session(has_pin_setup, user.pin_unlocked),
        token: None,
    }))
}
