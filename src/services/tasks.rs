// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Native reminder triggers backed by Cloud Tasks.
//!
//! Each scheduled reminder is one task with a `schedule_time`, delivered as
//! `POST /tasks/send-reminder` carrying a short-lived reminder token.
//! Task names are derived from a fixed per-user tag plus the fire time, so
//! a reminder can be cancelled before the next one is created. Cloud Tasks
//! refuses to reuse a recently deleted name, so each name also carries the
//! creation time. The full name travels in the payload and the token, and
//! the handler ignores callbacks from tasks that are no longer current.
//!
//! Uses the official google-cloud-tasks-v2 SDK.

use crate::error::AppError;
use crate::middleware::auth::create_reminder_token;
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Fixed prefix of every reminder task name.
pub const REMINDER_TASK_TAG: &str = "pulse-daily-reminder";

/// Payload sent to the reminder task handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReminderPayload {
    pub uid: String,
    /// Full name of the task that made this call.
    pub task: String,
}

/// Delivery scheduled outside this process.
#[async_trait]
pub trait NativeTrigger: Send + Sync {
    /// Schedule one delivery for `uid` at local wall-clock time `at`.
    ///
    /// Returns a trigger name, unique per call, that is passed back to the
    /// callback and to [`NativeTrigger::cancel`].
    async fn schedule(&self, uid: &str, at: NaiveDateTime) -> Result<String, AppError>;

    /// Cancel a previously scheduled delivery. Unknown names are not an error.
    async fn cancel(&self, name: &str) -> Result<(), AppError>;
}

/// Task id for a reminder: `{tag}-{uid}-{YYYYMMDDhhmm}`.
///
/// Cloud Tasks ids only allow letters, digits, `-` and `_`.
pub fn reminder_task_id(uid: &str, at: NaiveDateTime) -> String {
    let uid: String = uid
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
        .collect();
    format!("{}-{}-{}", REMINDER_TASK_TAG, uid, at.format("%Y%m%d%H%M"))
}

/// Cloud Tasks client wrapper.
pub struct CloudTasksTrigger {
    project_id: String,
    location: String,
    queue_name: String,
    service_url: String,
    signing_key: Vec<u8>,
}

impl CloudTasksTrigger {
    pub fn new(
        project_id: &str,
        region: &str,
        queue_name: &str,
        service_url: &str,
        signing_key: &[u8],
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            location: region.to_string(),
            queue_name: queue_name.to_string(),
            service_url: service_url.trim_end_matches('/').to_string(),
            signing_key: signing_key.to_vec(),
        }
    }

    fn queue_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location, self.queue_name
        )
    }

    async fn client(&self) -> Result<google_cloud_tasks_v2::client::CloudTasks, AppError> {
        google_cloud_tasks_v2::client::CloudTasks::builder()
            .build()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cloud Tasks client error: {}", e)))
    }
}

fn rpc_code(err: &google_cloud_gax::error::Error) -> Option<google_cloud_gax::error::rpc::Code> {
    err.status().map(|s| s.code)
}

#[async_trait]
impl NativeTrigger for CloudTasksTrigger {
    async fn schedule(&self, uid: &str, at: NaiveDateTime) -> Result<String, AppError> {
        use google_cloud_gax::error::rpc::Code;
        use google_cloud_tasks_v2::model::{HttpRequest, Task};

        let fire_at = chrono::Local
            .from_local_datetime(&at)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&at));

        let name = format!(
            "{}/tasks/{}-{}",
            self.queue_path(),
            reminder_task_id(uid, at),
            Utc::now().timestamp_millis()
        );

        // The token only needs to outlive the queue's retry window.
        let token =
            create_reminder_token(uid, &name, &self.signing_key, fire_at + Duration::days(1))?;

        let body = serde_json::to_vec(&SendReminderPayload {
            uid: uid.to_string(),
            task: name.clone(),
        })
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;

        let http_request = HttpRequest::default()
            .set_url(format!("{}/tasks/send-reminder", self.service_url))
            .set_http_method("POST")
            .set_body(axum::body::Bytes::from(body))
            .set_headers(std::collections::HashMap::from([
                (
                    "Content-Type".to_string(),
                    "application/json".to_string(),
                ),
                ("Authorization".to_string(), format!("Bearer {}", token)),
            ]));

        let task = Task::default()
            .set_name(name.clone())
            .set_schedule_time(google_cloud_wkt::Timestamp::clamp(fire_at.timestamp(), 0))
            .set_http_request(http_request);

        let result = self
            .client()
            .await?
            .create_task()
            .set_parent(self.queue_path())
            .set_task(task)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!(uid, task = %name, fire_at = %fire_at, "Scheduled reminder task");
                Ok(name)
            }
            // Retried create: the task is already queued.
            Err(e) if rpc_code(&e) == Some(Code::AlreadyExists) => {
                tracing::debug!(uid, task = %name, "Reminder task already exists");
                Ok(name)
            }
            Err(e) => Err(AppError::Internal(anyhow::anyhow!(
                "Cloud Tasks create error: {}",
                e
            ))),
        }
    }

    async fn cancel(&self, name: &str) -> Result<(), AppError> {
        use google_cloud_gax::error::rpc::Code;

        let result = self
            .client()
            .await?
            .delete_task()
            .set_name(name)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!(task = %name, "Cancelled reminder task");
                Ok(())
            }
            Err(e) if rpc_code(&e) == Some(Code::NotFound) => Ok(()),
            Err(e) => Err(AppError::Internal(anyhow::anyhow!(
                "Cloud Tasks delete error: {}",
                e
            ))),
        }
    }
}

/// In-memory trigger registry for tests.
#[derive(Default)]
pub struct MemoryTrigger {
    scheduled: DashMap<String, (String, NaiveDateTime)>,
    fail: std::sync::atomic::AtomicBool,
    created: std::sync::atomic::AtomicU64,
}

impl MemoryTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `schedule` fail, to exercise the in-process fallback.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Currently scheduled (uid, fire time) pairs.
    pub fn pending(&self) -> Vec<(String, NaiveDateTime)> {
        self.scheduled.iter().map(|e| e.value().clone()).collect()
    }
}

#[async_trait]
impl NativeTrigger for MemoryTrigger {
    async fn schedule(&self, uid: &str, at: NaiveDateTime) -> Result<String, AppError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("trigger unavailable")));
        }
        let n = self
            .created
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let name = format!("{}-{}", reminder_task_id(uid, at), n);
        self.scheduled
            .insert(name.clone(), (uid.to_string(), at));
        Ok(name)
    }

    async fn cancel(&self, name: &str) -> Result<(), AppError> {
        self.scheduled.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 14)
            .unwrap()
            .and_hms_opt(20, 5, 0)
            .unwrap()
    }

    #[test]
    fn reminder_task_id_is_tagged_and_sanitized() {
        assert_eq!(
            reminder_task_id("abc123", at()),
            "pulse-daily-reminder-abc123-202506142005"
        );
        assert_eq!(
            reminder_task_id("a.b/c", at()),
            "pulse-daily-reminder-a-b-c-202506142005"
        );
    }

    #[test]
    fn queue_path_format() {
        let trigger = CloudTasksTrigger::new(
            "proj",
            "us-west1",
            "daily-reminders",
            "https://api.example.com/",
            b"key",
        );
        assert_eq!(
            trigger.queue_path(),
            "projects/proj/locations/us-west1/queues/daily-reminders"
        );
        assert_eq!(trigger.service_url, "https://api.example.com");
    }

    #[tokio::test]
    async fn memory_trigger_cancel_removes() {
        let trigger = MemoryTrigger::new();
        let name = trigger.schedule("u1", at()).await.unwrap();
        assert_eq!(trigger.pending().len(), 1);
        trigger.cancel(&name).await.unwrap();
        assert!(trigger.pending().is_empty());
        // Cancelling again is a no-op.
        trigger.cancel(&name).await.unwrap();
    }

    #[tokio::test]
    async fn memory_trigger_names_are_unique() {
        let trigger = MemoryTrigger::new();
        let first = trigger.schedule("u1", at()).await.unwrap();
        let second = trigger.schedule("u1", at()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(trigger.pending().len(), 2);

        trigger.cancel(&first).await.unwrap();
        assert_eq!(trigger.pending().len(), 1);
    }

    #[tokio::test]
    async fn memory_trigger_failure_toggle() {
        let trigger = MemoryTrigger::new();
        trigger.set_failing(true);
        assert!(trigger.schedule("u1", at()).await.is_err());
    }
}
