// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Streak and completion-rate calculation over the journal.
//!
//! Journal entries are sparse: a day with no entry counts as "not done".
//! Both figures are anchored on the caller's local `today`.

use crate::models::{HabitKey, JournalEntry};
use crate::time_utils::date_id;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// Number of trailing days (including today) in the completion window.
pub const COMPLETION_WINDOW_DAYS: i64 = 7;

/// Journal entries indexed by date id for day-by-day lookups.
pub struct EntryIndex<'a> {
    by_id: HashMap<&'a str, &'a JournalEntry>,
}

impl<'a> EntryIndex<'a> {
    pub fn new(entries: &'a [JournalEntry]) -> Self {
        Self {
            by_id: entries.iter().map(|e| (e.id.as_str(), e)).collect(),
        }
    }

    fn is_done(&self, key: HabitKey, day: NaiveDate) -> bool {
        self.by_id
            .get(date_id(day).as_str())
            .is_some_and(|entry| key.is_done(entry))
    }

    /// Consecutive days ending today on which `key` was done.
    ///
    /// Zero when today's entry is missing or the flag is false. A gap ends
    /// the streak; it is never skipped over.
    pub fn current_streak(&self, key: HabitKey, today: NaiveDate) -> u32 {
        let mut streak = 0;
        let mut day = today;
        while self.is_done(key, day) {
            streak += 1;
            day -= Duration::days(1);
        }
        streak
    }

    /// Percentage of the last seven days (today included) on which `key` was done.
    pub fn completion_rate(&self, key: HabitKey, today: NaiveDate) -> u32 {
        let done = (0..COMPLETION_WINDOW_DAYS)
            .filter(|offset| self.is_done(key, today - Duration::days(*offset)))
            .count();
        (done as f64 / COMPLETION_WINDOW_DAYS as f64 * 100.0).round() as u32
    }
}

/// Convenience wrapper for a single streak lookup.
pub fn current_streak(entries: &[JournalEntry], key: HabitKey, today: NaiveDate) -> u32 {
    EntryIndex::new(entries).current_streak(key, today)
}

/// Convenience wrapper for a single completion-rate lookup.
pub fn completion_rate(entries: &[JournalEntry], key: HabitKey, today: NaiveDate) -> u32 {
    EntryIndex::new(entries).completion_rate(key, today)
}

/// Per-habit figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub habit: HabitKey,
    pub streak: u32,
    pub completion_rate_7d: u32,
}

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub today: String,
    pub no_fap_streak: u32,
    pub no_porn_streak: u32,
    pub workout_completion_rate: u32,
    pub habits: Vec<HabitStats>,
}

impl DashboardStats {
    pub fn compute(entries: &[JournalEntry], today: NaiveDate) -> Self {
        let index = EntryIndex::new(entries);
        let habits: Vec<HabitStats> = HabitKey::ALL
            .into_iter()
            .map(|habit| HabitStats {
                habit,
                streak: index.current_streak(habit, today),
                completion_rate_7d: index.completion_rate(habit, today),
            })
            .collect();

        Self {
            today: date_id(today),
            no_fap_streak: index.current_streak(HabitKey::NoFap, today),
            no_porn_streak: index.current_streak(HabitKey::NoPorn, today),
            workout_completion_rate: index.completion_rate(HabitKey::Workout, today),
            habits,
        }
    }
}
