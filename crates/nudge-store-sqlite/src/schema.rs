//! Table layout for the key-value store. Run on every open.

/// One row per key. Safe to re-run.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS items (
    key         TEXT PRIMARY KEY,
    value_json  TEXT NOT NULL,   -- compact JSON document
    updated_at  TEXT NOT NULL    -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
