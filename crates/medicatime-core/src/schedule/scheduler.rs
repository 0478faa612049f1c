//! Generation scheduler: at-most-daily catch-up of the log window.

use chrono::{NaiveDate, NaiveDateTime};

use super::generator::{GenerationReport, LogGenerator};
use crate::clock::Clock;
use crate::db::KeyValueStore;
use crate::store::{EntityStore, StoreResult};

/// Where the scheduler stands relative to the last generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    NeverRun,
    RunOn(NaiveDate),
}

impl GenerationState {
    pub fn from_last_run(last_run: Option<NaiveDateTime>) -> Self {
        match last_run {
            Some(at) => GenerationState::RunOn(at.date()),
            None => GenerationState::NeverRun,
        }
    }

    /// Whether a run is due at `now`.
    ///
    /// A last run dated in the future (clock moved back) counts as current.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        match self {
            GenerationState::NeverRun => true,
            GenerationState::RunOn(date) => (now.date() - *date).num_days() >= 1,
        }
    }
}

/// Result of an activation check.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerOutcome {
    /// The window was regenerated.
    Generated(GenerationReport),
    /// Already generated today.
    UpToDate { last_run: NaiveDate },
}

impl SchedulerOutcome {
    pub fn generated(&self) -> bool {
        matches!(self, SchedulerOutcome::Generated(_))
    }
}

/// Decides, once per activation, whether to rerun the log generator.
pub struct GenerationScheduler<'a, S: KeyValueStore> {
    store: &'a EntityStore<S>,
    clock: &'a dyn Clock,
    days_ahead: u32,
}

impl<'a, S: KeyValueStore> GenerationScheduler<'a, S> {
    pub fn new(store: &'a EntityStore<S>, clock: &'a dyn Clock, days_ahead: u32) -> Self {
        Self {
            store,
            clock,
            days_ahead,
        }
    }

    /// Current scheduler state from the stored timestamp.
    pub fn state(&self) -> StoreResult<GenerationState> {
        Ok(GenerationState::from_last_run(self.store.last_generation()?))
    }

    /// Regenerate the profile's window unless it already ran today.
    ///
    /// After a gap of several days the window is rebuilt relative to today;
    /// missed days are not replayed.
    pub fn ensure_current(&self, profile_id: &str) -> StoreResult<SchedulerOutcome> {
        let state = self.state()?;
        let now = self.clock.now();

        match state {
            GenerationState::RunOn(last_run) if !state.is_due(now) => {
                tracing::debug!(profile_id = %profile_id, %last_run, "Dose logs up to date");
                Ok(SchedulerOutcome::UpToDate { last_run })
            }
            _ => {
                tracing::debug!(profile_id = %profile_id, ?state, "Dose log generation due");
                let report =
                    LogGenerator::new(self.store, self.clock).generate(profile_id, self.days_ahead)?;
                Ok(SchedulerOutcome::Generated(report))
            }
        }
    }
}
