//! Profile models.

use serde::{Deserialize, Serialize};

/// A named scope grouping one person's medications and dose logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Opaque unique ID
    pub id: String,
    /// Display name (used as the merge key on backup import)
    pub name: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl Profile {
    /// Create a new profile with a fresh ID.
    pub fn new(name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Copy of this profile under a different name.
    pub fn renamed(&self, name: String) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }
}
