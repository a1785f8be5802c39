// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Date-bucketed journal log view.

use crate::models::JournalEntry;
use crate::time_utils::{date_id, parse_date_id};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time window applied to the log history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFilter {
    #[default]
    All,
    Last7Days,
    Last30Days,
    ThisMonth,
    ThisYear,
}

impl LogFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFilter::All => "all",
            LogFilter::Last7Days => "last-7-days",
            LogFilter::Last30Days => "last-30-days",
            LogFilter::ThisMonth => "this-month",
            LogFilter::ThisYear => "this-year",
        }
    }

    /// Whether an entry id falls inside this window relative to `today`.
    ///
    /// Ids that do not parse as dates only match `All`.
    pub fn matches(self, id: &str, today: NaiveDate) -> bool {
        if self == LogFilter::All {
            return true;
        }
        let Some(date) = parse_date_id(id) else {
            return false;
        };
        let days_ago = (today - date).num_days();
        match self {
            LogFilter::All => true,
            LogFilter::Last7Days => days_ago <= 7,
            LogFilter::Last30Days => days_ago <= 30,
            LogFilter::ThisMonth => date.year() == today.year() && date.month() == today.month(),
            LogFilter::ThisYear => date.year() == today.year(),
        }
    }
}

impl fmt::Display for LogFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown log filter: {0}")]
pub struct UnknownLogFilter(pub String);

impl FromStr for LogFilter {
    type Err = UnknownLogFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(LogFilter::All),
            "last-7-days" => Ok(LogFilter::Last7Days),
            "last-30-days" => Ok(LogFilter::Last30Days),
            "this-month" => Ok(LogFilter::ThisMonth),
            "this-year" => Ok(LogFilter::ThisYear),
            other => Err(UnknownLogFilter(other.to_string())),
        }
    }
}

/// A journal entry as shown in the log list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogItem {
    #[serde(flatten)]
    pub entry: JournalEntry,
    /// Only today's entry can be opened for editing.
    pub editable: bool,
}

/// Apply `filter` and return entries newest first with their edit state.
pub fn filter_entries(
    entries: Vec<JournalEntry>,
    filter: LogFilter,
    today: NaiveDate,
) -> Vec<LogItem> {
    let today_id = date_id(today);
    let mut items: Vec<LogItem> = entries
        .into_iter()
        .filter(|entry| filter.matches(&entry.id, today))
        .map(|entry| LogItem {
            editable: entry.id == today_id,
            entry,
        })
        .collect();
    // Ids are zero-padded dates, so lexical order is date order.
    items.sort_by(|a, b| b.entry.id.cmp(&a.entry.id));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    fn entry_days_ago(days: i64) -> JournalEntry {
        JournalEntry {
            id: date_id(today() - Duration::days(days)),
            ..Default::default()
        }
    }

    fn ids(items: &[LogItem]) -> Vec<&str> {
        items.iter().map(|i| i.entry.id.as_str()).collect()
    }

    #[test]
    fn test_last_7_days_boundary() {
        let items = filter_entries(
            vec![entry_days_ago(8), entry_days_ago(7), entry_days_ago(0)],
            LogFilter::Last7Days,
            today(),
        );
        assert_eq!(ids(&items), vec!["2025-06-14", "2025-06-07"]);
    }

    #[test]
    fn test_last_30_days_boundary() {
        let items = filter_entries(
            vec![entry_days_ago(31), entry_days_ago(30)],
            LogFilter::Last30Days,
            today(),
        );
        assert_eq!(ids(&items), vec!["2025-05-15"]);
    }

    #[test]
    fn test_calendar_windows() {
        let entries = vec![entry_days_ago(13), entry_days_ago(14), entry_days_ago(200)];
        let month = filter_entries(entries.clone(), LogFilter::ThisMonth, today());
        assert_eq!(ids(&month), vec!["2025-06-01"]);

        let year = filter_entries(entries, LogFilter::ThisYear, today());
        assert_eq!(ids(&year), vec!["2025-06-01", "2025-05-31"]);
    }

    #[test]
    fn test_newest_first_and_only_today_editable() {
        let items = filter_entries(
            vec![entry_days_ago(2), entry_days_ago(0), entry_days_ago(1)],
            LogFilter::All,
            today(),
        );
        assert_eq!(ids(&items), vec!["2025-06-14", "2025-06-13", "2025-06-12"]);
        assert!(items[0].editable);
        assert!(!items[1].editable);
        assert!(!items[2].editable);
    }

    #[test]
    fn test_invalid_ids_only_in_all() {
        let bad = JournalEntry {
            id: "garbage".to_string(),
            ..Default::default()
        };
        assert_eq!(
            filter_entries(vec![bad.clone()], LogFilter::All, today()).len(),
            1
        );
        assert!(filter_entries(vec![bad], LogFilter::ThisYear, today()).is_empty());
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!("last-7-days".parse::<LogFilter>().unwrap(), LogFilter::Last7Days);
        assert_eq!(LogFilter::ThisMonth.to_string(), "this-month");
        assert!("last-week".parse::<LogFilter>().is_err());
    }
}
