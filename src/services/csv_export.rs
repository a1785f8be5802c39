//! CSV export of the journal.

use crate::models::JournalEntry;
use chrono::NaiveDate;
use std::fmt::Write;

pub const CSV_HEADER: &str = "Date,WakeUp,Sleep,NoFap,NoPorn,Workout,WorksDone,MealBreakfast,MealLunch,MealDinner,MealSnacks,ScreenTime,Mood,NewThingLearned,Timestamp";

/// Download file name for an export made on `today`.
pub fn export_file_name(today: NaiveDate) -> String {
    format!("habit_tracker_data_{}.csv", crate::time_utils::date_id(today))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// Wrap free text in double quotes, doubling any embedded quote.
fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn screen_time(hours: f64) -> String {
    if hours == 0.0 {
        String::new()
    } else {
        hours.to_string()
    }
}

/// Render all entries as CSV, one row per entry in ascending date order.
pub fn export_csv(entries: &[JournalEntry]) -> String {
    let mut sorted: Vec<&JournalEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + sorted.len() * 128);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for entry in sorted {
        // Mood has no source field and is always left empty.
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},,{},{}",
            entry.id,
            entry.wake_up,
            entry.sleep,
            yes_no(entry.no_fap),
            yes_no(entry.no_porn),
            yes_no(entry.workout),
            quoted(&entry.works_done),
            quoted(&entry.meals.breakfast),
            quoted(&entry.meals.lunch),
            quoted(&entry.meals.dinner),
            quoted(&entry.meals.snacks),
            screen_time(entry.screen_time),
            quoted(&entry.new_thing_learned),
            entry.timestamp,
        );
    }
    out
}
