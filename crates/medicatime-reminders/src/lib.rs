//! Daily dose reminders for MedicaTime.
//!
//! [`ReminderBook`] implements the core [`Notifier`](medicatime_core::Notifier):
//! it turns each medication time into a daily reminder request, keeps the
//! scheduled requests by identifier, and maps a tapped reminder back to the
//! dose log it refers to.

pub mod book;
pub mod request;

pub use book::*;
pub use request::*;
