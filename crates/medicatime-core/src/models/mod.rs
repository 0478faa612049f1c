//! Domain models for MedicaTime.

mod log;
mod medication;
mod profile;

pub use log::*;
pub use medication::*;
pub use profile::*;

use thiserror::Error;

/// Model validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Medication name is required")]
    EmptyName,

    #[error("Medication dose is required")]
    EmptyDose,

    #[error("At least one dose time is required")]
    NoTimes,

    #[error("Invalid dose time: {0}")]
    InvalidTime(String),

    #[error("Profile name is required")]
    EmptyProfileName,
}

pub type ModelResult<T> = Result<T, ModelError>;
