//! Typed preference branch over a [`KeyValueStore`], with change listeners.
//!
//! A branch namespaces its keys with a prefix (`extensions.nudge.`). Writes
//! publish the preference name on a topic of the same name, so listeners
//! subscribe per preference.

use std::{fmt, sync::Arc};

use serde_json::Value;

use crate::{
  store::KeyValueStore,
  topics::{Callback, SubscriptionId, Topics},
};

/// The value types a preference can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
  String(String),
  Int(i64),
  Bool(bool),
}

impl PrefValue {
  fn from_json(value: Value) -> Option<Self> {
    match value {
      Value::String(s) => Some(Self::String(s)),
      Value::Bool(b) => Some(Self::Bool(b)),
      Value::Number(n) => n.as_i64().map(Self::Int),
      _ => None,
    }
  }

  fn into_json(self) -> Value {
    match self {
      Self::String(s) => Value::String(s),
      Self::Int(i) => Value::from(i),
      Self::Bool(b) => Value::Bool(b),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Self::Int(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(b) => Some(*b),
      _ => None,
    }
  }
}

impl fmt::Display for PrefValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::String(s) => f.write_str(s),
      Self::Int(i) => write!(f, "{i}"),
      Self::Bool(b) => write!(f, "{b}"),
    }
  }
}

impl From<&str> for PrefValue {
  fn from(s: &str) -> Self { Self::String(s.to_owned()) }
}

impl From<String> for PrefValue {
  fn from(s: String) -> Self { Self::String(s) }
}

impl From<i64> for PrefValue {
  fn from(i: i64) -> Self { Self::Int(i) }
}

impl From<bool> for PrefValue {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

// ─── Preferences ─────────────────────────────────────────────────────────────

pub struct Preferences<S> {
  store:     Arc<S>,
  branch:    String,
  listeners: Topics<String>,
}

impl<S: KeyValueStore> Preferences<S> {
  pub fn new(store: Arc<S>, branch: impl Into<String>) -> Self {
    Self {
      store,
      branch: branch.into(),
      listeners: Topics::new(),
    }
  }

  pub fn branch(&self) -> &str { &self.branch }

  /// Read a preference. Values of a type preferences cannot hold read as
  /// absent.
  pub async fn get(&self, name: &str) -> Result<Option<PrefValue>, S::Error> {
    let Some(value) = self.store.get_item(&self.key(name)).await? else {
      return Ok(None);
    };
    let pref = PrefValue::from_json(value);
    if pref.is_none() {
      tracing::warn!(name, branch = %self.branch, "preference has unsupported type");
    }
    Ok(pref)
  }

  pub async fn get_or(
    &self,
    name: &str,
    default: impl Into<PrefValue>,
  ) -> Result<PrefValue, S::Error> {
    Ok(self.get(name).await?.unwrap_or_else(|| default.into()))
  }

  pub async fn set(
    &self,
    name: &str,
    value: impl Into<PrefValue>,
  ) -> Result<(), S::Error> {
    let value = value.into().into_json();
    self.store.set_item(&self.key(name), value).await?;
    self.notify(name);
    Ok(())
  }

  pub async fn has(&self, name: &str) -> Result<bool, S::Error> {
    Ok(self.store.get_item(&self.key(name)).await?.is_some())
  }

  pub async fn remove(&self, name: &str) -> Result<(), S::Error> {
    self.store.remove_item(&self.key(name)).await?;
    self.notify(name);
    Ok(())
  }

  /// Remove every preference in the branch. Returns how many were removed.
  pub async fn clear(&self) -> Result<usize, S::Error> {
    let keys = self.store.keys_with_prefix(&self.branch).await?;
    for key in &keys {
      self.store.remove_item(key).await?;
      self.notify(&key[self.branch.len()..]);
    }
    Ok(keys.len())
  }

  /// Call `callback` with the preference name whenever it is set or removed.
  pub fn add_listener(
    &self,
    name: &str,
    callback: impl Fn(&String) + Send + Sync + 'static,
  ) -> SubscriptionId {
    self.listeners.subscribe(name, callback)
  }

  /// Detach a listener, returning its callback.
  pub fn remove_listener(&self, id: SubscriptionId) -> Option<Callback<String>> {
    self.listeners.unsubscribe(id).map(|s| s.callback)
  }

  fn key(&self, name: &str) -> String { format!("{}{name}", self.branch) }

  fn notify(&self, name: &str) {
    let fired = self.listeners.publish(name, &name.to_owned());
    tracing::trace!(name, fired, "preference changed");
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use serde_json::json;

  use super::*;
  use crate::memory::MemoryStore;

  fn prefs() -> (Arc<MemoryStore>, Preferences<MemoryStore>) {
    let kv = Arc::new(MemoryStore::new());
    (Arc::clone(&kv), Preferences::new(kv, "extensions.nudge."))
  }

  #[tokio::test]
  async fn typed_values_roundtrip_under_branch() {
    let (kv, p) = prefs();
    p.set("homepage", "https://example.com").await.unwrap();
    p.set("interval", 42i64).await.unwrap();
    p.set("enabled", true).await.unwrap();

    assert_eq!(
      p.get("homepage").await.unwrap(),
      Some(PrefValue::String("https://example.com".into()))
    );
    assert_eq!(p.get("interval").await.unwrap().and_then(|v| v.as_int()), Some(42));
    assert_eq!(p.get("enabled").await.unwrap().and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
      kv.get_item("extensions.nudge.interval").await.unwrap(),
      Some(json!(42))
    );
  }

  #[tokio::test]
  async fn missing_and_unsupported_values() {
    let (kv, p) = prefs();
    assert_eq!(p.get("nope").await.unwrap(), None);
    assert_eq!(p.get_or("nope", false).await.unwrap(), PrefValue::Bool(false));
    assert!(!p.has("nope").await.unwrap());

    kv.set_item("extensions.nudge.list", json!([1, 2])).await.unwrap();
    assert!(p.has("list").await.unwrap());
    assert_eq!(p.get("list").await.unwrap(), None);
  }

  #[tokio::test]
  async fn listeners_fire_on_set_and_remove() {
    let (_, p) = prefs();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let id = p.add_listener("enabled", move |name| log.lock().unwrap().push(name.clone()));

    p.set("enabled", true).await.unwrap();
    p.set("other", 1i64).await.unwrap();
    p.remove("enabled").await.unwrap();
    assert_eq!(*seen.lock().unwrap(), ["enabled", "enabled"]);

    assert!(p.remove_listener(id).is_some());
    p.set("enabled", false).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn clear_removes_only_the_branch() {
    let (kv, p) = prefs();
    p.set("a", 1i64).await.unwrap();
    p.set("b", "x").await.unwrap();
    kv.set_item("extensions.other.a", json!(1)).await.unwrap();

    assert_eq!(p.clear().await.unwrap(), 2);
    assert!(!p.has("a").await.unwrap());
    assert_eq!(kv.keys_with_prefix("extensions.").await.unwrap(), ["extensions.other.a"]);
  }
}
