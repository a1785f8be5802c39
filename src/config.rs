//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read from the environment once at startup.

use crate::time_utils::ReminderTime;
use std::env;

/// Cloud Tasks queue used for native reminder triggers.
pub const REMINDER_QUEUE_NAME: &str = "daily-reminders";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Firebase web API key used for the Auth REST API
    pub firebase_api_key: String,
    /// Firebase app ID; all documents live under `artifacts/{app_id}`
    pub firebase_app_id: String,
    /// GCP project ID (Firestore, Cloud Tasks)
    pub gcp_project_id: String,
    /// GCP region for Cloud Tasks
    pub gcp_region: String,
    /// Cloud Storage bucket for progress photos
    pub storage_bucket: String,
    /// Frontend URL (CORS, cookie attributes)
    pub frontend_url: String,
    /// Public URL of this API (Cloud Tasks callbacks)
    pub api_url: String,
    /// Server port
    pub port: u16,
    /// Cloud Tasks queue for reminders
    pub reminder_queue_name: String,
    /// Schedule reminders through Cloud Tasks instead of in-process timers only
    pub native_reminders: bool,
    /// Optional webhook receiving reminder deliveries
    pub notify_webhook_url: Option<String>,
    /// Reminder time used until the user picks one
    pub default_reminder_time: ReminderTime,

    // --- Secrets ---
    /// JWT signing key for session and reminder tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            firebase_api_key: "test_api_key".to_string(),
            firebase_app_id: "test-app".to_string(),
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            storage_bucket: "test-bucket".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            port: 8080,
            reminder_queue_name: REMINDER_QUEUE_NAME.to_string(),
            native_reminders: false,
            notify_webhook_url: None,
            default_reminder_time: ReminderTime::default(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

impl Config {
    /// Config used by tests and offline runs.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let default_reminder_time = match env::var("DEFAULT_REMINDER_TIME") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("DEFAULT_REMINDER_TIME", raw))?,
            Err(_) => ReminderTime::default(),
        };

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        Ok(Self {
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            firebase_app_id: env::var("FIREBASE_APP_ID")
                .unwrap_or_else(|_| "pulse-local".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| format!("{}.appspot.com", gcp_project_id)),
            gcp_project_id,
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-west1".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            reminder_queue_name: env::var("REMINDER_QUEUE_NAME")
                .unwrap_or_else(|_| REMINDER_QUEUE_NAME.to_string()),
            native_reminders: env::var("NATIVE_REMINDERS")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            default_reminder_time,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
