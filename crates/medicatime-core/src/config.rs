//! Core configuration.

use std::env;

use crate::store::{StoragePolicy, DEFAULT_KEY_PREFIX};

/// Default generation window, in days (today included).
pub const DEFAULT_DAYS_AHEAD: u32 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// Length of the forward-looking log window
    pub days_ahead: u32,
    /// How storage failures are handled
    pub storage_policy: StoragePolicy,
    /// Namespace prepended to every storage key
    pub key_prefix: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            days_ahead: DEFAULT_DAYS_AHEAD,
            storage_policy: StoragePolicy::Lenient,
            key_prefix: DEFAULT_KEY_PREFIX.into(),
        }
    }
}

impl CoreConfig {
    /// Read overrides from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            days_ahead: env::var("MEDICATIME_DAYS_AHEAD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.days_ahead),
            storage_policy: match env::var("MEDICATIME_STRICT_STORAGE")
                .ok()
                .and_then(|v| v.parse::<bool>().ok())
            {
                Some(true) => StoragePolicy::Strict,
                _ => StoragePolicy::Lenient,
            },
            key_prefix: env::var("MEDICATIME_KEY_PREFIX")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.key_prefix),
        }
    }

    pub fn with_days_ahead(mut self, days_ahead: u32) -> Self {
        self.days_ahead = days_ahead;
        self
    }

    pub fn with_storage_policy(mut self, policy: StoragePolicy) -> Self {
        self.storage_policy = policy;
        self
    }
}
