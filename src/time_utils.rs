// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting, document keys and the wall clock.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc, Weekday};
use std::fmt;
use std::str::FromStr;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Journal document id for a calendar date (`YYYY-MM-DD`).
pub fn date_id(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a journal document id back into a date.
pub fn parse_date_id(id: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(id, "%Y-%m-%d").ok()
}

/// Weekly document id (`YYYY-Www`) using ISO week numbering.
pub fn iso_week_id(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

/// Weekly check-ins are prompted on Saturdays.
pub fn is_check_in_day(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sat
}

/// Source of "now" in the user's local wall-clock time.
///
/// Streaks, log windows, the edit restriction and reminders are all anchored
/// to the local calendar day, so everything reads time through this trait.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the host's local time zone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Clock frozen at a fixed instant.
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> Self {
        Self(
            date.and_hms_opt(hour, minute, 0)
                .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN)),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Daily reminder time of day (`HH:MM`, 24h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl ReminderTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// True while the wall clock is inside this reminder's minute.
    pub fn matches_minute(&self, now: NaiveDateTime) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }

    /// Next time this reminder is due: today if still ahead of `now`, else tomorrow.
    pub fn next_occurrence(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now
            .date()
            .and_hms_opt(self.hour, self.minute, 0)
            .unwrap_or(now);
        if today <= now {
            today + Duration::days(1)
        } else {
            today
        }
    }
}

impl Default for ReminderTime {
    fn default() -> Self {
        Self {
            hour: 20,
            minute: 0,
        }
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid reminder time {0:?}, expected HH:MM")]
pub struct InvalidReminderTime(String);

impl FromStr for ReminderTime {
    type Err = InvalidReminderTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidReminderTime(s.to_string());
        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for ReminderTime {
    type Error = InvalidReminderTime;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReminderTime> for String {
    fn from(value: ReminderTime) -> Self {
        value.to_string()
    }
}
