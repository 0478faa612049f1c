//! Dose log store operations.

use super::{EntityStore, StoreResult};
use crate::db::KeyValueStore;
use crate::models::MedicationLog;

impl<S: KeyValueStore> EntityStore<S> {
    /// List logs, optionally for one profile.
    pub fn logs(&self, profile_id: Option<&str>) -> StoreResult<Vec<MedicationLog>> {
        self.list(profile_id)
    }

    /// Get a log by ID.
    pub fn get_log(&self, id: &str) -> StoreResult<Option<MedicationLog>> {
        self.get(id)
    }

    /// All logs of one medication, across profiles.
    pub fn logs_for_medication(&self, medication_id: &str) -> StoreResult<Vec<MedicationLog>> {
        Ok(self
            .logs(None)?
            .into_iter()
            .filter(|l| l.medication_id == medication_id)
            .collect())
    }

    /// Replace one profile's slice of the logs collection.
    ///
    /// Logs of every other profile are written back unchanged, ahead of the
    /// new slice.
    pub fn replace_profile_logs(
        &self,
        profile_id: &str,
        logs: Vec<MedicationLog>,
    ) -> StoreResult<()> {
        self.mutate::<MedicationLog, _, _>(|records| {
            records.retain(|l| l.profile_id != profile_id);
            records.extend(logs);
            ((), true)
        })
    }
}
