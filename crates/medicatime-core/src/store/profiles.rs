//! Profile store operations.

use super::{EntityStore, StoreResult};
use crate::db::KeyValueStore;
use crate::models::{Medication, MedicationLog, Profile};

/// What a cascading profile delete removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub profile_removed: bool,
    pub medications_removed: usize,
    pub logs_removed: usize,
    pub active_cleared: bool,
}

impl<S: KeyValueStore> EntityStore<S> {
    /// List all profiles.
    pub fn profiles(&self) -> StoreResult<Vec<Profile>> {
        self.list(None)
    }

    /// Get a profile by ID.
    pub fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>> {
        self.get(id)
    }

    /// First profile with exactly this name.
    pub fn find_profile_by_name(&self, name: &str) -> StoreResult<Option<Profile>> {
        Ok(self.profiles()?.into_iter().find(|p| p.name == name))
    }

    /// Delete a profile with all its medications and logs.
    ///
    /// Clears the active-profile pointer if it referenced the profile.
    pub fn delete_profile(&self, id: &str) -> StoreResult<CascadeReport> {
        let profile_removed = self.remove::<Profile, _>(|p| p.id == id)? > 0;
        let medications_removed = self.remove::<Medication, _>(|m| m.profile_id == id)?;
        let logs_removed = self.remove::<MedicationLog, _>(|l| l.profile_id == id)?;

        let active_cleared = match self.active_profile()? {
            Some(active) if active.id == id => {
                self.clear_active_profile()?;
                true
            }
            _ => false,
        };

        tracing::info!(
            profile_id = %id,
            medications_removed,
            logs_removed,
            active_cleared,
            "Deleted profile"
        );

        Ok(CascadeReport {
            profile_removed,
            medications_removed,
            logs_removed,
            active_cleared,
        })
    }
}
