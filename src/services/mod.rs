// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod csv_export;
pub mod identity;
pub mod log_filter;
pub mod notifier;
pub mod pin;
pub mod scheduler;
pub mod storage;
pub mod streaks;
pub mod tasks;

pub use identity::{FirebaseIdentity, Identity, IdentityProvider, MemoryIdentity};
pub use log_filter::{filter_entries, LogFilter, LogItem};
pub use notifier::{LogNotifier, MemoryNotifier, Notifier, Reminder, WebhookNotifier};
pub use scheduler::{NotificationScheduler, SchedulerState};
pub use storage::{BlobStore, GcsBlobStore, MemoryBlobStore};
pub use streaks::DashboardStats;
pub use tasks::{CloudTasksTrigger, MemoryTrigger, NativeTrigger};
