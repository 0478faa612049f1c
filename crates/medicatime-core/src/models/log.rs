//! Dose log models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::clock::{format_timestamp, parse_timestamp};

/// One concrete, dated, timed dose derived from a medication's schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLog {
    /// Deterministic ID: `medicationId-HH:MM-YYYY-MM-DD`
    pub id: String,
    /// Owning profile ID
    #[serde(default)]
    pub profile_id: String,
    /// Medication this dose belongs to
    pub medication_id: String,
    /// Local scheduled time, `YYYY-MM-DDTHH:MM:00`
    pub scheduled_time: String,
    /// Whether the dose was taken
    pub taken: bool,
    /// When the dose was taken (present iff `taken`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_time: Option<String>,
    /// Calendar date of `scheduled_time`, `YYYY-MM-DD`
    pub date: String,
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Deterministic log ID for a (medication, time, date) triple.
pub fn log_id(medication_id: &str, time: &str, date: NaiveDate) -> String {
    format!("{}-{}-{}", medication_id, time, date_string(date))
}

/// Local scheduled timestamp for a time of day on a date.
pub fn scheduled_time_string(time: &str, date: NaiveDate) -> String {
    format!("{}T{}:00", date_string(date), time)
}

impl MedicationLog {
    /// Create an untaken dose for `medication_id` at `time` on `date`.
    pub fn scheduled(profile_id: &str, medication_id: &str, time: &str, date: NaiveDate) -> Self {
        Self {
            id: log_id(medication_id, time, date),
            profile_id: profile_id.to_string(),
            medication_id: medication_id.to_string(),
            scheduled_time: scheduled_time_string(time, date),
            taken: false,
            taken_time: None,
            date: date_string(date),
        }
    }

    /// Parsed scheduled time.
    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.scheduled_time)
    }

    /// Parsed taken time.
    pub fn taken_at(&self) -> Option<NaiveDateTime> {
        self.taken_time.as_deref().and_then(parse_timestamp)
    }

    /// Time of day part of the scheduled time, `HH:MM`.
    pub fn time_of_day(&self) -> Option<&str> {
        self.scheduled_time
            .split_once('T')
            .and_then(|(_, time)| time.get(..5))
    }

    /// Mark the dose as taken at the given local time.
    pub fn mark_taken(&mut self, at: NaiveDateTime) {
        self.taken = true;
        self.taken_time = Some(format_timestamp(at));
    }

    /// Mark the dose as not taken, clearing the taken time.
    pub fn mark_not_taken(&mut self) {
        self.taken = false;
        self.taken_time = None;
    }

    /// `taken` and `taken_time` agree.
    pub fn is_consistent(&self) -> bool {
        self.taken == self.taken_time.is_some()
    }
}
