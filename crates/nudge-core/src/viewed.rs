//! Persisted "already viewed" bookkeeping on top of a [`KeyValueStore`].
//!
//! Store failures never propagate from here. A failed read behaves like an
//! absent value; a failed write is logged and the caller carries on, at worst
//! showing a notification again on a later check.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::store::KeyValueStore;

/// JSON array of campaign ids that must never be shown again.
pub const VIEWED_KEY: &str = "viewed-notifications";
/// Epoch millis of the very first eligibility check. Written once; the quiet
/// period is measured from it.
pub const FIRST_SEEN_KEY: &str = "viewed-notification-time";
/// Epoch millis of the last full eligibility scan.
pub const LAST_CHECK_KEY: &str = "notification-check-time";

/// Snapshot of everything persisted for the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewedState {
  /// In the order they were viewed; never contains duplicates.
  pub viewed_ids: Vec<String>,
  pub last_check: Option<DateTime<Utc>>,
  pub first_seen: Option<DateTime<Utc>>,
}

impl ViewedState {
  pub fn is_viewed(&self, id: &str) -> bool {
    self.viewed_ids.iter().any(|v| v == id)
  }
}

pub struct ViewedStateStore<S> {
  store: Arc<S>,
}

impl<S> Clone for ViewedStateStore<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: KeyValueStore> ViewedStateStore<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// The quiet-period anchor: when the first check ever ran. Absent on a
  /// fresh profile, in which case `now` is stored and returned.
  ///
  /// Scans never move it; see [`Self::record_scan`].
  pub async fn get_last_check_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(at) = self.read_millis(FIRST_SEEN_KEY).await {
      return at;
    }
    tracing::debug!(%now, "first notification check, starting quiet period");
    self.write(FIRST_SEEN_KEY, encode_millis(now)).await;
    now
  }

  /// Remember when a full scan ran. Informational only.
  pub async fn record_scan(&self, now: DateTime<Utc>) {
    self.write(LAST_CHECK_KEY, encode_millis(now)).await;
  }

  pub async fn is_viewed(&self, id: &str) -> bool {
    self.viewed_ids().await.iter().any(|v| v == id)
  }

  /// Append `id` to the viewed set. Returns `true` if it was not there yet.
  pub async fn mark_viewed(&self, id: &str) -> bool {
    self.mark_all_viewed([id]).await == 1
  }

  /// Append every id not already viewed, in one write. Returns how many
  /// were added.
  pub async fn mark_all_viewed<'i>(
    &self,
    ids: impl IntoIterator<Item = &'i str>,
  ) -> usize {
    let mut viewed = self.viewed_ids().await;
    let before = viewed.len();
    for id in ids {
      if !viewed.iter().any(|v| v == id) {
        viewed.push(id.to_owned());
      }
    }
    let added = viewed.len() - before;
    if added > 0 {
      self.write(VIEWED_KEY, Value::from(viewed)).await;
    }
    added
  }

  pub async fn viewed_ids(&self) -> Vec<String> {
    match self.read(VIEWED_KEY).await {
      Some(value) => decode_ids(value),
      None => Vec::new(),
    }
  }

  pub async fn load(&self) -> ViewedState {
    ViewedState {
      viewed_ids: self.viewed_ids().await,
      last_check: self.read_millis(LAST_CHECK_KEY).await,
      first_seen: self.read_millis(FIRST_SEEN_KEY).await,
    }
  }

  // ── Raw access ──────────────────────────────────────────────────────────

  async fn read(&self, key: &str) -> Option<Value> {
    match self.store.get_item(key).await {
      Ok(value) => value,
      Err(e) => {
        tracing::warn!(key, error = %e, "store read failed, treating as absent");
        None
      }
    }
  }

  async fn read_millis(&self, key: &str) -> Option<DateTime<Utc>> {
    let value = self.read(key).await?;
    let decoded = decode_millis(&value);
    if decoded.is_none() && !is_zero(&value) {
      tracing::warn!(key, %value, "malformed timestamp, treating as absent");
    }
    decoded
  }

  async fn write(&self, key: &str, value: Value) {
    if let Err(e) = self.store.set_item(key, value).await {
      tracing::warn!(key, error = %e, "store write failed");
    }
  }
}

// ─── Codecs ──────────────────────────────────────────────────────────────────

fn encode_millis(at: DateTime<Utc>) -> Value { Value::from(at.timestamp_millis()) }

/// Numbers and numeric strings are accepted; host local storage stringifies.
/// Zero means "never", matching the host's `|| 0` default.
fn decode_millis(value: &Value) -> Option<DateTime<Utc>> {
  let millis = match value {
    Value::Number(n) => n.as_i64()?,
    Value::String(s) => s.trim().parse().ok()?,
    _ => return None,
  };
  if millis == 0 {
    return None;
  }
  DateTime::from_timestamp_millis(millis)
}

fn is_zero(value: &Value) -> bool {
  value.as_i64() == Some(0) || value.as_str().is_some_and(|s| s.trim() == "0")
}

/// Anything but an array of strings reads as empty; duplicates collapse.
fn decode_ids(value: Value) -> Vec<String> {
  let items = match value {
    Value::Array(items) => items,
    other => {
      tracing::warn!(key = VIEWED_KEY, value = %other, "malformed viewed list, treating as empty");
      return Vec::new();
    }
  };
  let mut ids: Vec<String> = Vec::with_capacity(items.len());
  for item in items {
    if let Value::String(id) = item
      && !ids.contains(&id)
    {
      ids.push(id);
    }
  }
  ids
}
