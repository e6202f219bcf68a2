/// Per-doctor slot index and slot key helpers.
///
/// A doctor's calendar only records which times are already taken on each
/// date. Free times are derived by generating the working day's slot times
/// and filtering out the booked ones.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format of a slot time, e.g. "09:30 AM".
pub const SLOT_TIME_FORMAT: &str = "%I:%M %p";

/// Booked times keyed by date-key, each date's times in booking order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotIndex {
    dates: BTreeMap<String, Vec<String>>,
}

impl SlotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `time` is already taken on `date`.
    pub fn is_booked(&self, date: &str, time: &str) -> bool {
        self.dates
            .get(date)
            .is_some_and(|times| times.iter().any(|t| t == time))
    }

    /// Append `time` to `date` unless it is already present.
    ///
    /// Returns false when the slot was taken.
    pub fn book(&mut self, date: &str, time: &str) -> bool {
        let times = self.dates.entry(date.to_string()).or_default();
        if times.iter().any(|t| t == time) {
            return false;
        }
        times.push(time.to_string());
        true
    }

    /// Remove `time` from `date`. Dates left without times are dropped.
    pub fn release(&mut self, date: &str, time: &str) -> bool {
        let Some(times) = self.dates.get_mut(date) else {
            return false;
        };
        let before = times.len();
        times.retain(|t| t != time);
        let removed = times.len() != before;
        if times.is_empty() {
            self.dates.remove(date);
        }
        removed
    }

    /// Times booked on `date`, in booking order.
    pub fn booked_on(&self, date: &str) -> &[String] {
        self.dates.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Date-keys that have at least one booking.
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.dates.keys().map(String::as_str)
    }

    /// Total number of booked slots across all dates.
    pub fn len(&self) -> usize {
        self.dates.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Filter a day's generated slot times down to the unbooked ones.
    pub fn free_times(&self, date: &str, day_times: &[String]) -> Vec<String> {
        day_times
            .iter()
            .filter(|time| !self.is_booked(date, time))
            .cloned()
            .collect()
    }
}

/// Build the date-key for a calendar day: day and month unpadded,
/// separated by underscores (`3_7_2025`).
pub fn slot_date_key(date: NaiveDate) -> String {
    format!("{}_{}_{}", date.day(), date.month(), date.year())
}

/// Parse a date-key back into a calendar day.
pub fn parse_slot_date_key(key: &str) -> Option<NaiveDate> {
    let mut parts = key.split('_');
    let day = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Generate the slot times for one working day.
///
/// Slots run from `start_hour` until the last one that ends by `end_hour`.
/// Slots overlapping the optional break window are skipped.
pub fn daily_slot_times(
    start_hour: u32,
    end_hour: u32,
    slot_minutes: i64,
    break_window: Option<(NaiveTime, NaiveTime)>,
) -> Vec<String> {
    let mut times = Vec::new();
    if slot_minutes <= 0 {
        return times;
    }

    let (Some(mut current), Some(end)) = (
        NaiveTime::from_hms_opt(start_hour, 0, 0),
        NaiveTime::from_hms_opt(end_hour, 0, 0),
    ) else {
        return times;
    };

    let step = Duration::minutes(slot_minutes);
    while current < end {
        let (slot_end, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 || slot_end > end {
            break;
        }

        let in_break = match break_window {
            Some((break_start, break_end)) => current < break_end && slot_end > break_start,
            None => false,
        };

        if !in_break {
            times.push(current.format(SLOT_TIME_FORMAT).to_string());
        }

        current = slot_end;
    }

    times
}
