// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod journal;
pub mod notification;
pub mod user;
pub mod weekly;

pub use journal::{HabitKey, JournalEntry, Meals};
pub use notification::NotificationSettings;
pub use user::{Theme, UserProfile};
pub use weekly::{PhotoType, ProgressPhoto, WeeklyEntry};
