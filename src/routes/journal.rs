// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Journal, log history and CSV export routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{JournalEntry, Meals};
use crate::services::csv_export::{export_csv, export_file_name};
use crate::services::log_filter::{filter_entries, LogFilter, LogItem};
use crate::time_utils::{date_id, format_utc_rfc3339, parse_date_id};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub const ENTRY_NOT_FOUND: &str = "Entry not found for the selected date.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/journal/today", get(get_today))
        .route("/api/journal/{date}", get(get_entry).put(save_entry))
        .route("/api/logs", get(get_logs))
        .route("/api/export.csv", get(export))
}

// ─── Journal Entries ─────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalResponse {
    pub date: String,
    pub editable: bool,
    pub entry: Option<JournalEntry>,
}

/// Today's entry, or `null` when nothing was saved yet.
async fn get_today(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<JournalResponse>> {
    let today = date_id(state.clock.today());
    let entry = state.db.get_journal_entry(&user.uid, &today).await?;
    Ok(Json(JournalResponse {
        date: today,
        editable: true,
        entry,
    }))
}

/// View any day's entry. Only today's is marked editable.
async fn get_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<String>,
) -> Result<Json<JournalResponse>> {
    if parse_date_id(&date).is_none() {
        return Err(AppError::BadRequest(format!("Invalid date: {}", date)));
    }

    let entry = state
        .db
        .get_journal_entry(&user.uid, &date)
        .await?
        .ok_or_else(|| AppError::NotFound(ENTRY_NOT_FOUND.to_string()))?;

    Ok(Json(JournalResponse {
        editable: date == date_id(state.clock.today()),
        date,
        entry: Some(entry),
    }))
}

/// Editable journal fields.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalInput {
    #[validate(length(max = 5))]
    pub wake_up: String,
    #[validate(length(max = 5))]
    pub sleep: String,
    pub no_fap: bool,
    pub no_porn: bool,
    pub workout: bool,
    #[validate(length(max = 5000))]
    pub works_done: String,
    #[validate(nested)]
    pub meals: Meals,
    #[validate(range(min = 0.0, max = 24.0, message = "Screen time must be between 0 and 24 hours"))]
    pub screen_time: f64,
    #[validate(length(max = 5000))]
    pub new_thing_learned: String,
}

/// Empty, or a 24h `HH:MM` time.
fn is_time_of_day(value: &str) -> bool {
    value.is_empty() || chrono::NaiveTime::parse_from_str(value, "%H:%M").is_ok()
}

/// Save today's entry. Any other date is rejected.
async fn save_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<String>,
    Json(input): Json<JournalInput>,
) -> Result<Json<JournalResponse>> {
    let today = date_id(state.clock.today());
    if date != today {
        tracing::info!(uid = %user.uid, date = %date, "Rejected edit of past entry");
        return Err(AppError::edit_restricted());
    }

    input.validate()?;
    for (field, value) in [("wakeUp", &input.wake_up), ("sleep", &input.sleep)] {
        if !is_time_of_day(value) {
            return Err(AppError::BadRequest(format!(
                "{} must be a time in HH:MM format",
                field
            )));
        }
    }

    let entry = JournalEntry {
        id: today.clone(),
        wake_up: input.wake_up,
        sleep: input.sleep,
        no_fap: input.no_fap,
        no_porn: input.no_porn,
        workout: input.workout,
        works_done: input.works_done,
        meals: input.meals,
        screen_time: input.screen_time,
        new_thing_learned: input.new_thing_learned,
        timestamp: format_utc_rfc3339(chrono::Utc::now()),
    };
    state.db.set_journal_entry(&user.uid, &entry).await?;

    tracing::info!(uid = %user.uid, date = %today, "Journal entry saved");
    Ok(Json(JournalResponse {
        date: today,
        editable: true,
        entry: Some(entry),
    }))
}

// ─── Log History ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub filter: LogFilter,
    pub today: String,
    pub entries: Vec<LogItem>,
}

async fn get_logs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>> {
    let filter = match query.filter.as_deref() {
        None | Some("") => LogFilter::All,
        Some(raw) => raw
            .parse::<LogFilter>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
    };

    let today = state.clock.today();
    let entries = state.db.list_journal_entries(&user.uid).await?;

    Ok(Json(LogsResponse {
        filter,
        today: date_id(today),
        entries: filter_entries(entries, filter, today),
    }))
}

// ─── CSV Export ──────────────────────────────────────────────

async fn export(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let entries = state.db.list_journal_entries(&user.uid).await?;
    let body = export_csv(&entries);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(state.clock.today())
    );

    tracing::info!(uid = %user.uid, rows = entries.len(), "Exported journal as CSV");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
