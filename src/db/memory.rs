//! In-memory document store for tests and offline development.

use crate::db::HabitStore;
use crate::error::AppError;
use crate::models::{JournalEntry, NotificationSettings, ProgressPhoto, UserProfile, WeeklyEntry};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

type UserKey = (String, String);

/// Document store backed by concurrent hash maps.
#[derive(Default)]
pub struct MemoryDb {
    profiles: DashMap<String, UserProfile>,
    journal: DashMap<UserKey, JournalEntry>,
    weekly: DashMap<UserKey, WeeklyEntry>,
    photos: DashMap<UserKey, ProgressPhoto>,
    notifications: DashMap<String, NotificationSettings>,
    offline: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as if the backend were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "Database not connected (offline mode)".to_string(),
            ));
        }
        Ok(())
    }

    fn key(uid: &str, id: &str) -> UserKey {
        (uid.to_string(), id.to_string())
    }
}

#[async_trait]
impl HabitStore for MemoryDb {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.check_online()?;
        Ok(self.profiles.get(uid).map(|p| p.clone()))
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.check_online()?;
        self.profiles.insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn get_journal_entry(
        &self,
        uid: &str,
        date_id: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        self.check_online()?;
        Ok(self.journal.get(&Self::key(uid, date_id)).map(|e| e.clone()))
    }

    async fn set_journal_entry(&self, uid: &str, entry: &JournalEntry) -> Result<(), AppError> {
        self.check_online()?;
        self.journal
            .insert(Self::key(uid, &entry.id), entry.clone());
        Ok(())
    }

    async fn list_journal_entries(&self, uid: &str) -> Result<Vec<JournalEntry>, AppError> {
        self.check_online()?;
        Ok(self
            .journal
            .iter()
            .filter(|item| item.key().0 == uid)
            .map(|item| item.value().clone())
            .collect())
    }

    async fn get_weekly_entry(
        &self,
        uid: &str,
        week_id: &str,
    ) -> Result<Option<WeeklyEntry>, AppError> {
        self.check_online()?;
        Ok(self.weekly.get(&Self::key(uid, week_id)).map(|e| e.clone()))
    }

    async fn set_weekly_entry(&self, uid: &str, entry: &WeeklyEntry) -> Result<(), AppError> {
        self.check_online()?;
        self.weekly.insert(Self::key(uid, &entry.id), entry.clone());
        Ok(())
    }

    async fn add_progress_photo(
        &self,
        uid: &str,
        doc_id: &str,
        photo: &ProgressPhoto,
    ) -> Result<(), AppError> {
        self.check_online()?;
        self.photos.insert(Self::key(uid, doc_id), photo.clone());
        Ok(())
    }

    async fn list_progress_photos(&self, uid: &str) -> Result<Vec<ProgressPhoto>, AppError> {
        self.check_online()?;
        let mut photos: Vec<ProgressPhoto> = self
            .photos
            .iter()
            .filter(|item| item.key().0 == uid)
            .map(|item| item.value().clone())
            .collect();
        photos.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(photos)
    }

    async fn get_notification_settings(
        &self,
        uid: &str,
    ) -> Result<Option<NotificationSettings>, AppError> {
        self.check_online()?;
        Ok(self.notifications.get(uid).map(|s| s.clone()))
    }

    async fn set_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<(), AppError> {
        self.check_online()?;
        self.notifications
            .insert(settings.uid.clone(), settings.clone());
        Ok(())
    }

    async fn list_enabled_notification_settings(
        &self,
    ) -> Result<Vec<NotificationSettings>, AppError> {
        self.check_online()?;
        Ok(self
            .notifications
            .iter()
            .filter(|item| item.enabled)
            .map(|item| item.value().clone())
            .collect())
    }
}
