//! Daily reminder scheduling seam.
//!
//! The core only tells a [`Notifier`] when a medication's reminders must be
//! (re)scheduled or cancelled; platform delivery lives outside this crate.

use thiserror::Error;

use crate::models::Medication;

/// Reminder backend errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifierError {
    #[error("Reminder backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid reminder time: {0}")]
    InvalidTime(String),
}

pub type NotifierResult<T> = Result<T, NotifierError>;

/// Schedules one daily reminder per medication time.
pub trait Notifier: Send {
    /// Replace every reminder of the medication with one per daily time.
    fn schedule(&self, medication: &Medication) -> NotifierResult<()>;

    /// Cancel every reminder of a medication.
    fn cancel(&self, medication_id: &str) -> NotifierResult<()>;

    /// Cancel every reminder.
    fn cancel_all(&self) -> NotifierResult<()>;
}

/// A notifier that schedules nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn schedule(&self, medication: &Medication) -> NotifierResult<()> {
        tracing::debug!(medication_id = %medication.id, "Reminder scheduling skipped");
        Ok(())
    }

    fn cancel(&self, _medication_id: &str) -> NotifierResult<()> {
        Ok(())
    }

    fn cancel_all(&self) -> NotifierResult<()> {
        Ok(())
    }
}
