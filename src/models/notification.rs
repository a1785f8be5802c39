// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily reminder settings.

use crate::time_utils::ReminderTime;
use serde::{Deserialize, Serialize};

/// Per-user reminder preferences and delivery bookkeeping.
///
/// Stored at: `artifacts/{app_id}/notificationSettings/{uid}` so that enabled
/// users can be found with one query at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    /// Owner (also the document ID)
    pub uid: String,
    #[serde(default)]
    pub enabled: bool,
    /// Local time of day the reminder is due
    #[serde(default)]
    pub time: ReminderTime,
    /// Last calendar date a reminder was delivered (`YYYY-MM-DD`)
    #[serde(default)]
    pub last_fired_date: Option<String>,
    /// Fully-qualified name of the scheduled native trigger, if any
    #[serde(default)]
    pub native_task_name: Option<String>,
}

impl NotificationSettings {
    pub fn new(uid: &str, time: ReminderTime) -> Self {
        Self {
            uid: uid.to_string(),
            enabled: false,
            time,
            last_fired_date: None,
            native_task_name: None,
        }
    }
}
