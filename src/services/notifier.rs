//! Reminder delivery channels.

use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub const REMINDER_TITLE: &str = "Pulse Daily Reminder";
pub const REMINDER_BODY: &str = "It's time to log your progress for today. Let's do it!";

/// Content of one reminder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub title: String,
    pub body: String,
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            title: REMINDER_TITLE.to_string(),
            body: REMINDER_BODY.to_string(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the channel whether `uid` may receive reminders.
    async fn request_permission(&self, uid: &str) -> Result<bool, AppError>;

    async fn deliver(&self, uid: &str, reminder: &Reminder) -> Result<(), AppError>;
}

/// Writes reminders to the structured log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn request_permission(&self, _uid: &str) -> Result<bool, AppError> {
        Ok(true)
    }

    async fn deliver(&self, uid: &str, reminder: &Reminder) -> Result<(), AppError> {
        tracing::info!(uid, title = %reminder.title, body = %reminder.body, "Reminder delivered");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    uid: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Posts reminders as JSON to a configured URL.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn request_permission(&self, _uid: &str) -> Result<bool, AppError> {
        Ok(true)
    }

    async fn deliver(&self, uid: &str, reminder: &Reminder) -> Result<(), AppError> {
        let payload = WebhookPayload {
            uid,
            title: &reminder.title,
            body: &reminder.body,
        };
        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Webhook unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "Webhook returned HTTP {}",
                response.status()
            )));
        }
        tracing::info!(uid, "Reminder delivered via webhook");
        Ok(())
    }
}

/// Records deliveries in memory; permission can be switched off.
#[derive(Default)]
pub struct MemoryNotifier {
    denied: AtomicBool,
    failing: AtomicBool,
    delivered: Mutex<Vec<(String, Reminder)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_permission_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    /// Make `deliver` fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Uids of all deliveries so far, in order.
    pub fn deliveries(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|d| d.iter().map(|(uid, _)| uid.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn request_permission(&self, _uid: &str) -> Result<bool, AppError> {
        Ok(!self.denied.load(Ordering::SeqCst))
    }

    async fn deliver(&self, uid: &str, reminder: &Reminder) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Notification("delivery unavailable".to_string()));
        }
        self.delivered
            .lock()
            .map_err(|_| AppError::Notification("delivery log poisoned".to_string()))?
            .push((uid.to_string(), reminder.clone()));
        Ok(())
    }
}
