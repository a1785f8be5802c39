// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PIN gate routes.
//!
//! Setup and unlock re-issue the session with `pin_unlocked` set; reset
//! requires the account password and sends the user back to setup.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::auth::{issue_session, SessionResponse};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::services::pin::{hash_new_pin, is_valid_pin, verify_pin, PIN_FORMAT_MESSAGE, PIN_INCORRECT_MESSAGE};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/pin", get(pin_status))
        .route("/api/pin/setup", post(setup_pin))
        .route("/api/pin/verify", post(verify))
        .route("/api/pin/reset", post(reset_pin))
}

async fn load_profile(state: &AppState, uid: &str) -> Result<UserProfile> {
    state
        .db
        .get_profile(uid)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinStatusResponse {
    pub has_pin_setup: bool,
    pub pin_unlocked: bool,
}

async fn pin_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PinStatusResponse>> {
    let profile = load_profile(&state, &user.uid).await?;
    Ok(Json(PinStatusResponse {
        has_pin_setup: profile.has_pin_setup,
        pin_unlocked: user.pin_unlocked,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SetupPinRequest {
    pub pin: String,
    pub confirm: String,
}

/// Store a new PIN. Both entries must be six digits and equal.
async fn setup_pin(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    Json(req): Json<SetupPinRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let mut profile = load_profile(&state, &user.uid).await?;
    if profile.has_pin_setup {
        return Err(AppError::BadRequest(
            "A PIN is already set up. Reset it to choose a new one.".to_string(),
        ));
    }

    profile.pin = Some(hash_new_pin(&req.pin, &req.confirm, &user.uid)?);
    profile.has_pin_setup = true;
    state.db.upsert_profile(&profile).await?;

    tracing::info!(uid = %user.uid, "PIN set up");
    issue_session(&state, jar, &profile, true)
}

#[derive(Debug, Deserialize)]
pub struct VerifyPinRequest {
    pub pin: String,
}

/// Unlock the session with the PIN. A wrong PIN can be retried.
async fn verify(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    Json(req): Json<VerifyPinRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    if !is_valid_pin(&req.pin) {
        return Err(AppError::BadRequest(PIN_FORMAT_MESSAGE.to_string()));
    }

    let profile = load_profile(&state, &user.uid).await?;
    let stored = match (&profile.pin, profile.has_pin_setup) {
        (Some(stored), true) => stored,
        _ => return Err(AppError::BadRequest("No PIN has been set up.".to_string())),
    };

    if !verify_pin(&req.pin, &user.uid, stored) {
        tracing::info!(uid = %user.uid, "Incorrect PIN entered");
        return Err(AppError::PinMismatch(PIN_INCORRECT_MESSAGE.to_string()));
    }

    issue_session(&state, jar, &profile, true)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPinRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Clear the PIN after re-authenticating with the account password.
async fn reset_pin(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    Json(req): Json<ResetPinRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    req.validate()?;

    let mut profile = load_profile(&state, &user.uid).await?;
    let identity = state
        .identity
        .sign_in(&profile.email, &req.password)
        .await
        .map_err(|e| match e {
            // A wrong password here should not end the session.
            AppError::Identity(msg) => {
                AppError::Forbidden(format!("Re-authentication failed: {}", msg))
            }
            other => other,
        })?;

    if identity.uid != user.uid {
        return Err(AppError::Forbidden(
            "Re-authentication failed: account mismatch".to_string(),
        ));
    }

    profile.pin = None;
    profile.has_pin_setup = false;
    state.db.upsert_profile(&profile).await?;

    tracing::info!(uid = %user.uid, "PIN reset");
    issue_session(&state, jar, &profile, false)
}
