//! [`SqliteStore`]: [`KeyValueStore`] on one SQLite connection.

use std::path::Path;

use chrono::Utc;
use nudge_core::store::KeyValueStore;
use rusqlite::OptionalExtension as _;
use serde_json::Value;

use crate::{
  Result,
  encode::{decode_value, encode_dt, encode_value},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A key-value store backed by a single SQLite file. Clones share the
/// connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open or create the database file at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::with_schema(tokio_rusqlite::Connection::open(path).await?).await
  }

  /// A private database that disappears with the last clone.
  pub async fn open_in_memory() -> Result<Self> {
    Self::with_schema(tokio_rusqlite::Connection::open_in_memory().await?).await
  }

  async fn with_schema(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn })
  }

  /// Raw stored text for `key`, bypassing JSON decoding.
  async fn raw(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value_json FROM items WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }
}

// ─── KeyValueStore impl ──────────────────────────────────────────────────────

impl KeyValueStore for SqliteStore {
  type Error = crate::Error;

  async fn get_item(&self, key: &str) -> Result<Option<Value>> {
    self
      .raw(key)
      .await?
      .map(|raw| decode_value(key, &raw))
      .transpose()
  }

  async fn set_item(&self, key: &str, value: Value) -> Result<()> {
    let key = key.to_owned();
    let value_str = encode_value(&value);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (key, value_json, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET
             value_json = excluded.value_json,
             updated_at = excluded.updated_at",
          rusqlite::params![key, value_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_item(&self, key: &str) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM items WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
    let prefix = prefix.to_owned();
    let keys = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT key FROM items
           WHERE substr(key, 1, length(?1)) = ?1
           ORDER BY key",
        )?;
        let keys = stmt
          .query_map(rusqlite::params![prefix], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
      })
      .await?;
    Ok(keys)
  }
}
