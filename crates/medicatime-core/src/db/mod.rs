//! Key-value persistence layer for MedicaTime.
//!
//! Every collection is stored as one whole JSON blob under a named key. The
//! [`KeyValueStore`] trait is the seam the host platform can implement; two
//! implementations ship with the crate.

mod memory;
mod schema;
mod sqlite;

pub use memory::*;
pub use schema::*;
pub use sqlite::*;

use thiserror::Error;

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum KvError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

pub type KvResult<T> = Result<T, KvError>;

/// Atomic get/set/remove over whole text blobs.
///
/// Writes are assumed durable on return; no partial writes.
pub trait KeyValueStore: Send {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Remove all of `keys`. Missing keys are ignored.
    fn remove(&self, keys: &[&str]) -> KvResult<()>;
}
