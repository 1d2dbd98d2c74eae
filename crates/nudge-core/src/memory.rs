//! [`MemoryStore`], a process-local [`KeyValueStore`].

use std::{collections::BTreeMap, convert::Infallible, sync::Mutex};

use serde_json::Value;

use crate::store::KeyValueStore;

/// Keeps everything in a `BTreeMap`; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
  items: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn items(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Value>> {
    self.items.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get_item(&self, key: &str) -> Result<Option<Value>, Infallible> {
    Ok(self.items().get(key).cloned())
  }

  async fn set_item(&self, key: &str, value: Value) -> Result<(), Infallible> {
    self.items().insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove_item(&self, key: &str) -> Result<(), Infallible> {
    self.items().remove(key);
    Ok(())
  }

  async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, Infallible> {
    Ok(
      self
        .items()
        .range(prefix.to_owned()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, _)| k.clone())
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[tokio::test]
  async fn set_get_remove() {
    let s = MemoryStore::new();
    assert_eq!(s.get_item("a").await.unwrap(), None);

    s.set_item("a", json!([1, 2])).await.unwrap();
    assert_eq!(s.get_item("a").await.unwrap(), Some(json!([1, 2])));

    s.remove_item("a").await.unwrap();
    s.remove_item("a").await.unwrap();
    assert_eq!(s.get_item("a").await.unwrap(), None);
  }

  #[tokio::test]
  async fn prefix_scan_is_sorted_and_bounded() {
    let s = MemoryStore::new();
    for key in ["b.two", "a.x", "b.one", "bb", "c"] {
      s.set_item(key, json!(true)).await.unwrap();
    }
    assert_eq!(s.keys_with_prefix("b.").await.unwrap(), ["b.one", "b.two"]);
    assert_eq!(s.keys_with_prefix("").await.unwrap().len(), 5);
  }
}
