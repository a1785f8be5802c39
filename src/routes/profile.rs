//! Profile routes.

use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Theme, UserProfile};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/me", get(get_me).put(update_me))
}

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub uid: String,
    pub display_name: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub has_pin_setup: bool,
    pub theme: Option<Theme>,
}

impl From<UserProfile> for MeResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            display_name: profile.display_name(),
            uid: profile.uid,
            username: profile.username,
            email: profile.email,
            created_at: profile.created_at,
            has_pin_setup: profile.has_pin_setup,
            theme: profile.theme,
        }
    }
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let profile = state
        .db
        .get_profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.uid)))?;
    Ok(Json(profile.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: Option<String>,
    pub theme: Option<Theme>,
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<MeResponse>> {
    let req = UpdateProfileRequest {
        username: req.username.map(|u| u.trim().to_string()),
        theme: req.theme,
    };
    req.validate()?;

    let mut profile = state
        .db
        .get_profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.uid)))?;

    if let Some(username) = req.username {
        profile.username = username;
    }
    if let Some(theme) = req.theme {
        profile.theme = Some(theme);
    }
    state.db.upsert_profile(&profile).await?;

    Ok(Json(profile.into()))
}
