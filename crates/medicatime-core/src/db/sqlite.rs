//! SQLite-backed key-value store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{KeyValueStore, KvResult, SCHEMA};

/// Key-value store persisted in a single SQLite table.
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    /// Open store at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> KvResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create in-memory store (for testing).
    pub fn open_in_memory() -> KvResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Initialize schema.
    fn initialize(&self) -> KvResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// List stored keys in ascending order.
    pub fn keys(&self) -> KvResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv_store (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> KvResult<()> {
        for key in keys {
            self.conn
                .execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_store() -> SqliteKvStore {
        SqliteKvStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let store = SqliteKvStore::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_get_missing_key() {
        let store = setup_store();
        assert_eq!(store.get("profiles").unwrap(), None);
    }

    #[test]
    fn test_set_and_overwrite() {
        let store = setup_store();

        store.set("profiles", "[]").unwrap();
        assert_eq!(store.get("profiles").unwrap(), Some("[]".into()));

        store.set("profiles", r#"[{"id":"1"}]"#).unwrap();
        assert_eq!(store.get("profiles").unwrap(), Some(r#"[{"id":"1"}]"#.into()));
        assert_eq!(store.keys().unwrap(), vec!["profiles"]);
    }

    #[test]
    fn test_remove_many() {
        let store = setup_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.set("c", "3").unwrap();

        store.remove(&["a", "c", "missing"]).unwrap();

        assert_eq!(store.keys().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medicatime.db");

        {
            let store = SqliteKvStore::open(&path).unwrap();
            store.set("active_profile", r#"{"id":"p1"}"#).unwrap();
        }

        let reopened = SqliteKvStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("active_profile").unwrap(),
            Some(r#"{"id":"p1"}"#.into())
        );
    }
}
