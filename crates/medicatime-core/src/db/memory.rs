//! In-memory key-value store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{KeyValueStore, KvError, KvResult};

/// Mutex-guarded map with switchable failure injection.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_reads: Mutex<HashMap<String, usize>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail (or stop failing).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` reads of `key` fail, then recover.
    pub fn fail_next_reads(&self, key: &str, count: usize) {
        self.failing_reads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), count);
    }

    fn take_read_failure(&self, key: &str) -> bool {
        let mut failing = self.failing_reads.lock().unwrap_or_else(|e| e.into_inner());
        match failing.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Make every subsequent `set`/`remove` fail (or stop failing).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw value under `key`, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) || self.take_read_failure(key) {
            return Err(KvError::Unavailable(format!("read of {}", key)));
        }
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable(format!("write of {}", key)));
        }
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> KvResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("remove".into()));
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryKvStore::new();
        assert!(store.is_empty());

        store.set("logs", "[]").unwrap();
        assert_eq!(store.get("logs").unwrap(), Some("[]".into()));

        store.remove(&["logs"]).unwrap();
        assert_eq!(store.get("logs").unwrap(), None);
    }

    #[test]
    fn test_failure_injection() {
        let store = MemoryKvStore::new();
        store.set("logs", "[]").unwrap();

        store.fail_reads(true);
        assert!(store.get("logs").is_err());
        assert_eq!(store.raw("logs"), Some("[]".into()));

        store.fail_reads(false);
        store.fail_writes(true);
        assert!(store.set("logs", "[1]").is_err());
        assert!(store.remove(&["logs"]).is_err());
        assert_eq!(store.get("logs").unwrap(), Some("[]".into()));
    }

    #[test]
    fn test_fail_next_reads_recovers() {
        let store = MemoryKvStore::new();
        store.set("logs", "[]").unwrap();
        store.set("profiles", "[]").unwrap();

        store.fail_next_reads("logs", 1);
        assert!(store.get("profiles").is_ok());
        assert!(store.get("logs").is_err());
        assert_eq!(store.get("logs").unwrap(), Some("[]".into()));
    }
}
