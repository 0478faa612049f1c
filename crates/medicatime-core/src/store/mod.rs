//! Entity store: CRUD over whole-collection JSON blobs.
//!
//! Profiles, medications and logs each live in one blob. Every mutation is a
//! read-modify-write of the entire collection; there is no cross-collection
//! transaction.

mod logs;
mod medications;
mod profiles;
mod state;

pub use profiles::CascadeReport;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::db::KeyValueStore;
use crate::models::{Medication, MedicationLog, Profile};

/// Key suffix for the profiles collection.
pub const PROFILES_KEY: &str = "profiles";
/// Key suffix for the medications collection.
pub const MEDICATIONS_KEY: &str = "medications";
/// Key suffix for the logs collection.
pub const LOGS_KEY: &str = "logs";
/// Key suffix for the active-profile pointer.
pub const ACTIVE_PROFILE_KEY: &str = "active_profile";
/// Key suffix for the last log generation timestamp.
pub const LAST_GENERATION_KEY: &str = "last_log_generation";

/// Default key namespace.
pub const DEFAULT_KEY_PREFIX: &str = "@medicatime_";

/// Entity store errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Failed to read {key}: {reason}")]
    StorageRead { key: String, reason: String },

    #[error("Failed to write {key}: {reason}")]
    StorageWrite { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What the store does with backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoragePolicy {
    /// Reads degrade to empty/absent with a warning; write failures are
    /// logged and reported as success.
    #[default]
    Lenient,
    /// Read and write failures are returned to the caller.
    Strict,
}

/// A record stored in one of the flat collections.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Key suffix of the collection holding this entity.
    const COLLECTION: &'static str;

    /// Unique ID.
    fn id(&self) -> &str;

    /// Owning profile ID (a profile owns itself).
    fn profile_id(&self) -> &str;
}

impl Entity for Profile {
    const COLLECTION: &'static str = PROFILES_KEY;

    fn id(&self) -> &str {
        &self.id
    }

    fn profile_id(&self) -> &str {
        &self.id
    }
}

impl Entity for Medication {
    const COLLECTION: &'static str = MEDICATIONS_KEY;

    fn id(&self) -> &str {
        &self.id
    }

    fn profile_id(&self) -> &str {
        &self.profile_id
    }
}

impl Entity for MedicationLog {
    const COLLECTION: &'static str = LOGS_KEY;

    fn id(&self) -> &str {
        &self.id
    }

    fn profile_id(&self) -> &str {
        &self.profile_id
    }
}

/// Collection-level CRUD over a [`KeyValueStore`].
pub struct EntityStore<S: KeyValueStore> {
    kv: S,
    policy: StoragePolicy,
    prefix: String,
}

impl<S: KeyValueStore> EntityStore<S> {
    /// Create a store with the lenient policy and default key prefix.
    pub fn new(kv: S) -> Self {
        Self::with_options(kv, StoragePolicy::default(), DEFAULT_KEY_PREFIX)
    }

    /// Create a store with an explicit policy and key prefix.
    pub fn with_options(kv: S, policy: StoragePolicy, prefix: &str) -> Self {
        Self {
            kv,
            policy,
            prefix: prefix.to_string(),
        }
    }

    /// Underlying key-value store.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn policy(&self) -> StoragePolicy {
        self.policy
    }

    /// Fully qualified key for a collection suffix.
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    // =========================================================================
    // Blob access
    // =========================================================================

    /// Read and decode a blob, returning every failure.
    fn load<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        let key = self.key(name);
        let raw = self.kv.get(&key).map_err(|e| StoreError::StorageRead {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::StorageRead {
                    key,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Read a blob, applying the storage policy to failures.
    pub(crate) fn read<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        match self.load(name) {
            Ok(value) => Ok(value),
            Err(e) => self.absorb(e).map(|_| None),
        }
    }

    /// Encode and write a blob, applying the storage policy to failures.
    pub(crate) fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> StoreResult<()> {
        let key = self.key(name);
        let result = serde_json::to_string(value)
            .map_err(|e| e.to_string())
            .and_then(|json| self.kv.set(&key, &json).map_err(|e| e.to_string()));
        match result {
            Ok(()) => Ok(()),
            Err(reason) => self.absorb(StoreError::StorageWrite { key, reason }),
        }
    }

    /// Remove blobs, applying the storage policy to failures.
    pub(crate) fn remove_keys(&self, names: &[&str]) -> StoreResult<()> {
        let keys: Vec<String> = names.iter().map(|n| self.key(n)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        match self.kv.remove(&key_refs) {
            Ok(()) => Ok(()),
            Err(e) => self.absorb(StoreError::StorageWrite {
                key: keys.join(","),
                reason: e.to_string(),
            }),
        }
    }

    /// Swallow or propagate a failure according to the policy.
    fn absorb(&self, error: StoreError) -> StoreResult<()> {
        match (self.policy, &error) {
            (StoragePolicy::Strict, _) => Err(error),
            (StoragePolicy::Lenient, StoreError::StorageRead { key, reason }) => {
                tracing::warn!(key = %key, reason = %reason, "Storage read failed, using empty value");
                Ok(())
            }
            (StoragePolicy::Lenient, StoreError::StorageWrite { key, reason }) => {
                tracing::error!(key = %key, reason = %reason, "Storage write failed, change dropped");
                Ok(())
            }
        }
    }

    /// Read-modify-write one collection.
    ///
    /// `apply` returns its result and whether the collection changed; an
    /// unchanged collection is not written back. A failed read aborts the
    /// mutation instead of overwriting the stored blob.
    pub(crate) fn mutate<E, R, F>(&self, apply: F) -> StoreResult<R>
    where
        E: Entity,
        R: Default,
        F: FnOnce(&mut Vec<E>) -> (R, bool),
    {
        let mut records: Vec<E> = match self.load(E::COLLECTION) {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                let e = match e {
                    StoreError::StorageRead { key, reason } => StoreError::StorageWrite {
                        key,
                        reason: format!("collection unreadable, mutation skipped: {}", reason),
                    },
                    other => other,
                };
                return self.absorb(e).map(|_| R::default());
            }
        };
        let (result, changed) = apply(&mut records);
        if changed {
            self.write(E::COLLECTION, &records)?;
        }
        Ok(result)
    }

    // =========================================================================
    // Generic collection operations
    // =========================================================================

    /// List a collection in insertion order, optionally scoped to a profile.
    pub fn list<E: Entity>(&self, profile_id: Option<&str>) -> StoreResult<Vec<E>> {
        let records: Vec<E> = self.read(E::COLLECTION)?.unwrap_or_default();
        Ok(match profile_id {
            Some(profile_id) => records
                .into_iter()
                .filter(|r| r.profile_id() == profile_id)
                .collect(),
            None => records,
        })
    }

    /// Find a record by ID.
    pub fn get<E: Entity>(&self, id: &str) -> StoreResult<Option<E>> {
        Ok(self.list::<E>(None)?.into_iter().find(|r| r.id() == id))
    }

    /// Append a record.
    pub fn add<E: Entity>(&self, entity: &E) -> StoreResult<()> {
        self.mutate::<E, _, _>(|records| {
            records.push(entity.clone());
            ((), true)
        })
    }

    /// Replace the record with the same ID. Returns whether one was found.
    pub fn update<E: Entity>(&self, entity: &E) -> StoreResult<bool> {
        self.mutate::<E, _, _>(|records| {
            match records.iter_mut().find(|r| r.id() == entity.id()) {
                Some(slot) => {
                    *slot = entity.clone();
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    /// Remove every record matching `predicate`. Returns the removed count.
    pub fn remove<E: Entity, F: Fn(&E) -> bool>(&self, predicate: F) -> StoreResult<usize> {
        self.mutate::<E, _, _>(|records| {
            let before = records.len();
            records.retain(|r| !predicate(r));
            let removed = before - records.len();
            (removed, removed > 0)
        })
    }

    /// Overwrite a whole collection.
    pub fn save_all<E: Entity>(&self, records: &[E]) -> StoreResult<()> {
        self.write(E::COLLECTION, records)
    }
}
