//! SQLite schema definition.

/// Schema for the SQLite-backed key-value store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Key-Value Blobs
-- ============================================================================

CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,                         -- whole JSON blob
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
