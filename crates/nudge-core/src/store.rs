//! The persistence contract the engine relies on.
//!
//! The trait is implemented by storage backends (e.g. `nudge-store-sqlite`)
//! and by [`crate::memory::MemoryStore`]. Values are JSON so callers can keep
//! lists and numbers under a single key, as host local storage does.

use std::future::Future;

use serde_json::Value;

/// Abstraction over a string-keyed JSON value store.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tokio tasks (the delayed dismissal timer runs on one).
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read a value. Returns `None` if the key was never written.
  fn get_item<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + 'a;

  /// Write a value, replacing any previous one.
  fn set_item<'a>(
    &'a self,
    key: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a key. Deleting a missing key is not an error.
  fn remove_item<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// All keys starting with `prefix`, sorted.
  fn keys_with_prefix<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;
}
