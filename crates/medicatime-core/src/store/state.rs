//! Singleton state: active-profile pointer and last generation run.

use chrono::NaiveDateTime;

use super::{
    EntityStore, StoreResult, ACTIVE_PROFILE_KEY, LAST_GENERATION_KEY, LOGS_KEY,
    MEDICATIONS_KEY, PROFILES_KEY,
};
use crate::clock::{format_timestamp, parse_timestamp};
use crate::db::KeyValueStore;
use crate::models::Profile;

impl<S: KeyValueStore> EntityStore<S> {
    /// The profile currently in use, if any.
    pub fn active_profile(&self) -> StoreResult<Option<Profile>> {
        self.read(ACTIVE_PROFILE_KEY)
    }

    /// Point the active-profile pointer at `profile`.
    pub fn set_active_profile(&self, profile: &Profile) -> StoreResult<()> {
        self.write(ACTIVE_PROFILE_KEY, profile)
    }

    /// Clear the active-profile pointer.
    pub fn clear_active_profile(&self) -> StoreResult<()> {
        self.remove_keys(&[ACTIVE_PROFILE_KEY])
    }

    /// Raw stored last-generation timestamp.
    pub fn last_generation_raw(&self) -> StoreResult<Option<String>> {
        self.read(LAST_GENERATION_KEY)
    }

    /// Parsed last-generation timestamp. Unparseable values read as absent.
    pub fn last_generation(&self) -> StoreResult<Option<NaiveDateTime>> {
        Ok(self
            .last_generation_raw()?
            .as_deref()
            .and_then(parse_timestamp))
    }

    /// Record a generation run.
    pub fn set_last_generation(&self, at: NaiveDateTime) -> StoreResult<()> {
        self.write(LAST_GENERATION_KEY, &format_timestamp(at))
    }

    /// Remove every collection and singleton.
    pub fn clear_all(&self) -> StoreResult<()> {
        tracing::info!("Clearing all stored data");
        self.remove_keys(&[
            MEDICATIONS_KEY,
            LOGS_KEY,
            PROFILES_KEY,
            ACTIVE_PROFILE_KEY,
            LAST_GENERATION_KEY,
        ])
    }
}
