// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (`artifacts/{app}/users/{uid}`)
//! - Journal entries and weekly check-ins (per-user subcollections)
//! - Progress photo records (append-only)
//! - Notification settings (`artifacts/{app}/notificationSettings/{uid}`)

use crate::db::{collections, HabitStore};
use crate::error::AppError;
use crate::models::{JournalEntry, NotificationSettings, ProgressPhoto, UserProfile, WeeklyEntry};
use async_trait::async_trait;
use firestore::ParentPathBuilder;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    app_id: String,
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, app_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, app_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, app_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            app_id: app_id.to_string(),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, app_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            app_id: app_id.to_string(),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            app_id: "offline".to_string(),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// `artifacts/{app_id}`
    fn app_root(&self) -> Result<ParentPathBuilder, AppError> {
        self.get_client()?
            .parent_path(collections::ARTIFACTS, &self.app_id)
            .map_err(db_err)
    }

    /// `artifacts/{app_id}/users/{uid}`
    fn user_root(&self, uid: &str) -> Result<ParentPathBuilder, AppError> {
        self.app_root()?.at(collections::USERS, uid).map_err(db_err)
    }

    /// Fetch one document from a per-user subcollection.
    async fn get_user_doc<T>(&self, uid: &str, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let parent = self.user_root(uid)?;
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .parent(&parent)
            .obj()
            .one(id)
            .await
            .map_err(db_err)
    }

    /// Overwrite one document in a per-user subcollection.
    async fn set_user_doc<T>(&self, uid: &str, collection: &str, id: &str, object: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
    {
        let parent = self.user_root(uid)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .parent(&parent)
            .object(object)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl HabitStore for FirestoreDb {
    // ─── Profile Operations ──────────────────────────────────────

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        let parent = self.app_root()?;
        let profile: Option<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .parent(&parent)
            .obj()
            .one(uid)
            .await
            .map_err(db_err)?;

        // Profiles written by the web client do not carry the uid field.
        Ok(profile.map(|mut p| {
            p.uid = uid.to_string();
            p
        }))
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let parent = self.app_root()?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.uid)
            .parent(&parent)
            .object(profile)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ─── Journal Operations ──────────────────────────────────────

    async fn get_journal_entry(
        &self,
        uid: &str,
        date_id: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        let entry: Option<JournalEntry> = self
            .get_user_doc(uid, collections::JOURNAL_ENTRIES, date_id)
            .await?;
        Ok(entry.map(|mut e| {
            e.id = date_id.to_string();
            e
        }))
    }

    async fn set_journal_entry(&self, uid: &str, entry: &JournalEntry) -> Result<(), AppError> {
        self.set_user_doc(uid, collections::JOURNAL_ENTRIES, &entry.id, entry)
            .await
    }

    async fn list_journal_entries(&self, uid: &str) -> Result<Vec<JournalEntry>, AppError> {
        let parent = self.user_root(uid)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::JOURNAL_ENTRIES)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    // ─── Weekly Operations ───────────────────────────────────────

    async fn get_weekly_entry(
        &self,
        uid: &str,
        week_id: &str,
    ) -> Result<Option<WeeklyEntry>, AppError> {
        let entry: Option<WeeklyEntry> = self
            .get_user_doc(uid, collections::WEEKLY_ENTRIES, week_id)
            .await?;
        Ok(entry.map(|mut e| {
            e.id = week_id.to_string();
            e
        }))
    }

    async fn set_weekly_entry(&self, uid: &str, entry: &WeeklyEntry) -> Result<(), AppError> {
        self.set_user_doc(uid, collections::WEEKLY_ENTRIES, &entry.id, entry)
            .await
    }

    async fn add_progress_photo(
        &self,
        uid: &str,
        doc_id: &str,
        photo: &ProgressPhoto,
    ) -> Result<(), AppError> {
        self.set_user_doc(uid, collections::PROGRESS_PHOTOS, doc_id, photo)
            .await
    }

    async fn list_progress_photos(&self, uid: &str) -> Result<Vec<ProgressPhoto>, AppError> {
        let parent = self.user_root(uid)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROGRESS_PHOTOS)
            .parent(&parent)
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    // ─── Notification Settings ──────────────────────────────────

    async fn get_notification_settings(
        &self,
        uid: &str,
    ) -> Result<Option<NotificationSettings>, AppError> {
        let parent = self.app_root()?;
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::NOTIFICATION_SETTINGS)
            .parent(&parent)
            .obj()
            .one(uid)
            .await
            .map_err(db_err)
    }

    async fn set_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<(), AppError> {
        let parent = self.app_root()?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::NOTIFICATION_SETTINGS)
            .document_id(&settings.uid)
            .parent(&parent)
            .object(settings)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_enabled_notification_settings(
        &self,
    ) -> Result<Vec<NotificationSettings>, AppError> {
        let parent = self.app_root()?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATION_SETTINGS)
            .parent(&parent)
            .filter(|q| q.for_all([q.field("enabled").eq(true)]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }
}
