//! Dose log scheduling.
//!
//! Pipeline: Medications → Log Generator (window of N days from today)
//!           → Generation Scheduler (at most once per calendar day)

mod generator;
mod scheduler;

pub use generator::*;
pub use scheduler::*;
