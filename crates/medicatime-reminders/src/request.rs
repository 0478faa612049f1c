//! Reminder request payloads.

use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use medicatime_core::models::{log_id, parse_dose_time, Medication};
use medicatime_core::NotifierError;

/// Title shown on every dose reminder.
pub const REMINDER_TITLE: &str = "Medication Reminder";

/// Screen the host opens when a reminder is tapped.
pub const EDIT_LOG_SCREEN: &str = "EditLog";

/// Data attached to a reminder and handed back when it is tapped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderData {
    pub medication_id: String,
    /// Dose time, `HH:MM` as stored on the medication
    pub time: String,
    pub screen: String,
}

impl ReminderData {
    /// Dose log the reminder refers to on `date`.
    pub fn log_id(&self, date: NaiveDate) -> String {
        log_id(&self.medication_id, &self.time, date)
    }
}

/// When a reminder fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReminderTrigger {
    /// Every day at a local wall-clock time.
    Daily { hour: u32, minute: u32 },
}

/// A scheduled reminder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    /// Unique identifier, used to cancel the reminder
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub data: ReminderData,
    pub trigger: ReminderTrigger,
}

impl ReminderRequest {
    /// Daily reminder for one of a medication's times.
    pub fn daily(medication: &Medication, time: &str) -> Result<Self, NotifierError> {
        let at = parse_dose_time(time).map_err(|_| NotifierError::InvalidTime(time.to_string()))?;
        Ok(Self {
            identifier: uuid::Uuid::new_v4().to_string(),
            title: REMINDER_TITLE.to_string(),
            body: format!("Time to take {} - {}", medication.name, medication.dose),
            data: ReminderData {
                medication_id: medication.id.clone(),
                time: time.to_string(),
                screen: EDIT_LOG_SCREEN.to_string(),
            },
            trigger: ReminderTrigger::Daily {
                hour: at.hour(),
                minute: at.minute(),
            },
        })
    }

    /// One daily reminder per medication time.
    pub fn for_medication(medication: &Medication) -> Result<Vec<Self>, NotifierError> {
        medication
            .times
            .iter()
            .map(|time| Self::daily(medication, time))
            .collect()
    }
}
