//! In-process reminder book.

use std::sync::Mutex;

use chrono::NaiveDate;

use medicatime_core::models::Medication;
use medicatime_core::notifier::{Notifier, NotifierResult};

use crate::request::{ReminderData, ReminderRequest};

/// Whether the user allowed reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Granted,
    Denied,
}

/// Scheduled daily reminders, keyed by identifier.
#[derive(Debug, Default)]
pub struct ReminderBook {
    pending: Mutex<Vec<ReminderRequest>>,
    permission: Mutex<PermissionState>,
}

impl ReminderBook {
    pub fn new(permission: PermissionState) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            permission: Mutex::new(permission),
        }
    }

    pub fn permission(&self) -> PermissionState {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_permission(&self, permission: PermissionState) {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner()) = permission;
    }

    /// Every scheduled reminder, in scheduling order.
    pub fn pending(&self) -> Vec<ReminderRequest> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Scheduled reminders of one medication.
    pub fn pending_for(&self, medication_id: &str) -> Vec<ReminderRequest> {
        self.pending()
            .into_iter()
            .filter(|r| r.data.medication_id == medication_id)
            .collect()
    }

    /// Cancel a single reminder. Returns whether it existed.
    pub fn cancel_identifier(&self, identifier: &str) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let before = pending.len();
        pending.retain(|r| r.identifier != identifier);
        pending.len() != before
    }
}

impl Notifier for ReminderBook {
    /// Replace the medication's reminders with one per daily time.
    ///
    /// Existing reminders are cancelled even when permission is denied.
    fn schedule(&self, medication: &Medication) -> NotifierResult<()> {
        self.cancel(&medication.id)?;

        if self.permission() == PermissionState::Denied {
            tracing::debug!(medication_id = %medication.id, "Reminder permission denied");
            return Ok(());
        }

        let requests = ReminderRequest::for_medication(medication)?;
        let count = requests.len();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(requests);

        tracing::debug!(medication_id = %medication.id, count, "Scheduled reminders");
        Ok(())
    }

    fn cancel(&self, medication_id: &str) -> NotifierResult<()> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|r| r.data.medication_id != medication_id);
        Ok(())
    }

    fn cancel_all(&self) -> NotifierResult<()> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

/// Dose log ID for a tapped reminder, given the reminder's data payload.
///
/// The log is looked up on `today`, the day the reminder was tapped. Returns
/// `None` when the payload lacks a medication ID or time.
pub fn resolve_response(data: &serde_json::Value, today: NaiveDate) -> Option<String> {
    let data: ReminderData = match serde_json::from_value(data.clone()) {
        Ok(data) => data,
        Err(_) => ReminderData {
            medication_id: data.get("medicationId")?.as_str()?.to_string(),
            time: data.get("time")?.as_str()?.to_string(),
            screen: String::new(),
        },
    };
    if data.medication_id.is_empty() || data.time.is_empty() {
        return None;
    }
    Some(data.log_id(today))
}
