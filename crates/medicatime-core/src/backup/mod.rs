//! Profile backup export and import.
//!
//! A backup is one profile with its medications and dose logs, serialized as
//! pretty-printed JSON. Import merges by profile name.

mod codec;

pub use codec::*;

use thiserror::Error;

use crate::store::StoreError;

/// Backup errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackupError {
    #[error("Invalid backup file: {0}")]
    MalformedBackup(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub type BackupResult<T> = Result<T, BackupError>;
