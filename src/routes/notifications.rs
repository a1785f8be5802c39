// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily reminder settings routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::SchedulerState;
use crate::time_utils::ReminderTime;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/notifications",
        get(get_notifications).put(update_notifications),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub enabled: bool,
    pub time: ReminderTime,
    pub schedule: SchedulerState,
    pub native_available: bool,
    pub disclaimer: &'static str,
    pub last_fired_date: Option<String>,
}

async fn current(state: &AppState, uid: &str) -> Result<NotificationsResponse> {
    let settings = state.scheduler.settings(uid).await?;
    Ok(NotificationsResponse {
        enabled: settings.enabled,
        time: settings.time,
        schedule: state.scheduler.state(uid),
        native_available: state.scheduler.native_available(),
        disclaimer: state.scheduler.disclaimer(),
        last_fired_date: settings.last_fired_date,
    })
}

async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<NotificationsResponse>> {
    Ok(Json(current(&state, &user.uid).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotificationsRequest {
    pub enabled: bool,
    /// Keeps the stored time when omitted
    #[serde(default)]
    pub time: Option<ReminderTime>,
}

/// Enable, disable or reschedule the daily reminder.
async fn update_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateNotificationsRequest>,
) -> Result<Json<NotificationsResponse>> {
    if req.enabled {
        let time = match req.time {
            Some(time) => time,
            None => state.scheduler.settings(&user.uid).await?.time,
        };
        state.scheduler.enable(&user.uid, time).await?;
    } else {
        state.scheduler.disable(&user.uid).await?;
    }
    Ok(Json(current(&state, &user.uid).await?))
}
