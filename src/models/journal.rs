// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Daily journal entry model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Meals eaten during the day, free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Meals {
    #[validate(length(max = 1000))]
    pub breakfast: String,
    #[validate(length(max = 1000))]
    pub lunch: String,
    #[validate(length(max = 1000))]
    pub dinner: String,
    #[validate(length(max = 1000))]
    pub snacks: String,
}

/// One journal entry per calendar day.
///
/// Stored at: `artifacts/{app_id}/users/{uid}/journalEntries/{YYYY-MM-DD}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalEntry {
    /// Calendar date (`YYYY-MM-DD`), also the document ID
    #[serde(alias = "_firestore_id")]
    pub id: String,
    /// Wake-up time (HH:MM)
    pub wake_up: String,
    /// Bed time (HH:MM)
    pub sleep: String,
    pub no_fap: bool,
    pub no_porn: bool,
    pub workout: bool,
    /// What got done today
    pub works_done: String,
    pub meals: Meals,
    /// Screen time in hours
    pub screen_time: f64,
    pub new_thing_learned: String,
    /// When the entry was last saved (ISO 8601)
    pub timestamp: String,
}

/// Boolean habit flags tracked on each journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HabitKey {
    NoFap,
    NoPorn,
    Workout,
}

impl HabitKey {
    pub const ALL: [HabitKey; 3] = [HabitKey::NoFap, HabitKey::NoPorn, HabitKey::Workout];

    /// Whether the entry satisfies this habit.
    pub fn is_done(self, entry: &JournalEntry) -> bool {
        match self {
            HabitKey::NoFap => entry.no_fap,
            HabitKey::NoPorn => entry.no_porn,
            HabitKey::Workout => entry.workout,
        }
    }

    /// Field name as stored in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            HabitKey::NoFap => "noFap",
            HabitKey::NoPorn => "noPorn",
            HabitKey::Workout => "workout",
        }
    }
}

impl fmt::Display for HabitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HabitKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HabitKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown habit: {s}"))
    }
}
