//! Medication store operations.

use super::{EntityStore, StoreResult};
use crate::db::KeyValueStore;
use crate::models::Medication;

impl<S: KeyValueStore> EntityStore<S> {
    /// List medications, optionally for one profile.
    pub fn medications(&self, profile_id: Option<&str>) -> StoreResult<Vec<Medication>> {
        self.list(profile_id)
    }

    /// Get a medication by ID.
    pub fn get_medication(&self, id: &str) -> StoreResult<Option<Medication>> {
        self.get(id)
    }

    /// Delete a medication. Its logs are left in place.
    pub fn delete_medication(&self, id: &str) -> StoreResult<bool> {
        Ok(self.remove::<Medication, _>(|m| m.id == id)? > 0)
    }
}
