// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly weigh-in and progress photo routes.

use crate::db::collections;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{PhotoType, ProgressPhoto, WeeklyEntry};
use crate::time_utils::{date_id, format_utc_rfc3339, is_check_in_day, iso_week_id};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Largest accepted photo after base64 decoding.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

pub const INVALID_WEIGHT: &str = "Please enter a valid weight.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/weekly/current", get(get_current))
        .route("/api/weekly", post(save_weekly))
        .route("/api/photos", get(list_photos))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeekResponse {
    pub week_id: String,
    pub is_check_in_day: bool,
    pub entry: Option<WeeklyEntry>,
}

async fn get_current(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CurrentWeekResponse>> {
    let today = state.clock.today();
    let week_id = iso_week_id(today);
    let entry = state.db.get_weekly_entry(&user.uid, &week_id).await?;
    Ok(Json(CurrentWeekResponse {
        week_id,
        is_check_in_day: is_check_in_day(today),
        entry,
    }))
}

/// Image sent inline as base64.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpload {
    #[validate(length(min = 1, max = 200, message = "File name must be 1-200 characters"))]
    pub file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRequest {
    /// Number, or a numeric string as typed into the form
    pub weight: serde_json::Value,
    #[validate(nested)]
    pub front_photo: Option<PhotoUpload>,
    #[validate(nested)]
    pub side_photo: Option<PhotoUpload>,
}

/// Parse the submitted weight. Must be a finite, positive number.
pub fn parse_weight(value: &serde_json::Value) -> Option<f64> {
    let weight = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (weight.is_finite() && weight > 0.0 && weight < 1000.0).then_some(weight)
}

/// Object names keep only characters that are safe in a path segment.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct WeeklyResponse {
    pub entry: WeeklyEntry,
    pub photos: Vec<ProgressPhoto>,
}

/// Save this week's weight and upload any attached photos.
async fn save_weekly(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<WeeklyRequest>,
) -> Result<Json<WeeklyResponse>> {
    req.validate()?;
    let weight =
        parse_weight(&req.weight).ok_or_else(|| AppError::BadRequest(INVALID_WEIGHT.to_string()))?;

    let today = state.clock.today();
    let uploads = [
        (PhotoType::Front, req.front_photo),
        (PhotoType::Side, req.side_photo),
    ];

    // Decode everything before uploading anything.
    let mut decoded = Vec::new();
    for (photo_type, upload) in uploads {
        let Some(upload) = upload else { continue };
        if !upload.content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "{} photo must be an image",
                photo_type
            )));
        }
        let bytes = STANDARD
            .decode(upload.data.as_bytes())
            .map_err(|_| AppError::BadRequest(format!("{} photo is not valid base64", photo_type)))?;
        if bytes.is_empty() || bytes.len() > MAX_PHOTO_BYTES {
            return Err(AppError::BadRequest(format!(
                "{} photo must be between 1 byte and 10 MB",
                photo_type
            )));
        }
        decoded.push((photo_type, upload, bytes));
    }

    let app_id = &state.config.firebase_app_id;
    let uploads = decoded.into_iter().map(|(photo_type, upload, bytes)| {
        let state = state.clone();
        let uid = user.uid.clone();
        async move {
            let millis = chrono::Utc::now().timestamp_millis();
            let file_name = format!("{}_{}_{}", uid, millis, sanitize_file_name(&upload.file_name));
            let path = format!(
                "{}/{}/{}/{}/{}/{}",
                collections::ARTIFACTS,
                app_id,
                collections::USERS,
                uid,
                collections::PROGRESS_PHOTOS,
                file_name
            );
            let url = state
                .blobs
                .upload(&path, &upload.content_type, bytes)
                .await?;

            let photo = ProgressPhoto {
                url,
                date: date_id(today),
                timestamp: format_utc_rfc3339(chrono::Utc::now()),
                photo_type,
                file_name,
            };
            let doc_id = format!("{}_{}", millis, photo_type);
            state.db.add_progress_photo(&uid, &doc_id, &photo).await?;
            Ok::<_, AppError>(photo)
        }
    });
    let photos = futures_util::future::try_join_all(uploads).await?;

    let entry = WeeklyEntry {
        id: iso_week_id(today),
        weight,
        timestamp: format_utc_rfc3339(chrono::Utc::now()),
    };
    state.db.set_weekly_entry(&user.uid, &entry).await?;

    tracing::info!(
        uid = %user.uid,
        week = %entry.id,
        photos = photos.len(),
        "Weekly check-in saved"
    );
    Ok(Json(WeeklyResponse { entry, photos }))
}

/// All progress photos, newest first.
async fn list_photos(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ProgressPhoto>>> {
    Ok(Json(state.db.list_progress_photos(&user.uid).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight(&json!(72.5)), Some(72.5));
        assert_eq!(parse_weight(&json!(" 80 ")), Some(80.0));
        assert_eq!(parse_weight(&json!("heavy")), None);
        assert_eq!(parse_weight(&json!(-3)), None);
        assert_eq!(parse_weight(&json!(null)), None);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("me front.jpg"), "me_front.jpg");
        assert_eq!(sanitize_file_name("../x/y.png"), ".._x_y.png");
    }
}
