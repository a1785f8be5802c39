//! Database layer.
//!
//! Route handlers and services talk to [`HabitStore`]; production uses
//! Firestore, tests and offline runs use the in-memory store.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{JournalEntry, NotificationSettings, ProgressPhoto, UserProfile, WeeklyEntry};
use async_trait::async_trait;

/// Collection names as constants.
///
/// Documents are laid out as `artifacts/{app_id}/users/{uid}/{collection}/{id}`
/// so data written by the web client stays addressable.
pub mod collections {
    pub const ARTIFACTS: &str = "artifacts";
    pub const USERS: &str = "users";
    pub const JOURNAL_ENTRIES: &str = "journalEntries";
    pub const WEEKLY_ENTRIES: &str = "weeklyEntries";
    pub const PROGRESS_PHOTOS: &str = "progressPhotos";
    /// Reminder settings (keyed by uid, directly under the app root)
    pub const NOTIFICATION_SETTINGS: &str = "notificationSettings";
}

/// Document storage used by the application.
#[async_trait]
pub trait HabitStore: Send + Sync {
    // ─── Profiles ────────────────────────────────────────────────
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError>;

    // ─── Journal ─────────────────────────────────────────────────
    async fn get_journal_entry(
        &self,
        uid: &str,
        date_id: &str,
    ) -> Result<Option<JournalEntry>, AppError>;

    /// Overwrite the entry stored under `entry.id`.
    async fn set_journal_entry(&self, uid: &str, entry: &JournalEntry) -> Result<(), AppError>;

    /// All journal entries for a user, in no particular order.
    async fn list_journal_entries(&self, uid: &str) -> Result<Vec<JournalEntry>, AppError>;

    // ─── Weekly check-ins ────────────────────────────────────────
    async fn get_weekly_entry(
        &self,
        uid: &str,
        week_id: &str,
    ) -> Result<Option<WeeklyEntry>, AppError>;

    async fn set_weekly_entry(&self, uid: &str, entry: &WeeklyEntry) -> Result<(), AppError>;

    async fn add_progress_photo(
        &self,
        uid: &str,
        doc_id: &str,
        photo: &ProgressPhoto,
    ) -> Result<(), AppError>;

    /// Progress photos, newest first.
    async fn list_progress_photos(&self, uid: &str) -> Result<Vec<ProgressPhoto>, AppError>;

    // ─── Notification settings ───────────────────────────────────
    async fn get_notification_settings(
        &self,
        uid: &str,
    ) -> Result<Option<NotificationSettings>, AppError>;

    async fn set_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<(), AppError>;

    async fn list_enabled_notification_settings(
        &self,
    ) -> Result<Vec<NotificationSettings>, AppError>;
}
