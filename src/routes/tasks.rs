// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task handler routes for Cloud Tasks callbacks.
//!
//! These endpoints are called by Cloud Tasks, not directly by users.
//! Each request carries the reminder token minted when the task was queued.

use crate::error::{AppError, Result};
use crate::middleware::auth::verify_reminder_token;
use crate::services::tasks::SendReminderPayload;
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::header,
    routing::post,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Task handler routes (called by Cloud Tasks).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/send-reminder", post(send_reminder))
}

#[derive(Debug, Serialize)]
pub struct SendReminderResponse {
    pub delivered: bool,
}

/// Deliver a scheduled reminder and queue the next one.
async fn send_reminder(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<SendReminderPayload>,
) -> Result<Json<SendReminderResponse>> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            tracing::warn!(
                uid = %payload.uid,
                queue = ?headers.get("x-cloudtasks-queuename"),
                "Security Alert: Blocked reminder callback without token"
            );
            AppError::Unauthorized
        })?;

    let grant = verify_reminder_token(token, &state.config.jwt_signing_key)?;
    if grant.uid != payload.uid || grant.task != payload.task {
        tracing::warn!(
            token_uid = %grant.uid,
            payload_uid = %payload.uid,
            token_task = %grant.task,
            payload_task = %payload.task,
            "Security Alert: Reminder token does not match payload"
        );
        return Err(AppError::Forbidden("Reminder token mismatch".to_string()));
    }

    let delivered = state
        .scheduler
        .handle_native_trigger(&grant.uid, &grant.task)
        .await?;
    tracing::info!(uid = %grant.uid, task = %grant.task, delivered, "Processed reminder callback");
    Ok(Json(SendReminderResponse { delivered }))
}
