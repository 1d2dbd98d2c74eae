//! Typed publish/subscribe channels keyed by topic name.
//!
//! Each subscription gets a [`SubscriptionId`]; unsubscribing hands the
//! callback back to the caller. Callbacks run outside the internal lock, so a
//! callback may itself subscribe or unsubscribe.

use std::{
  collections::HashMap,
  fmt,
  sync::{Arc, Mutex, MutexGuard},
};

use uuid::Uuid;

pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A subscription removed from its topic.
pub struct Subscription<T> {
  pub id:       SubscriptionId,
  pub topic:    String,
  pub callback: Callback<T>,
}

pub struct Topics<T> {
  channels: Mutex<HashMap<String, Vec<(SubscriptionId, Callback<T>)>>>,
}

impl<T> Default for Topics<T> {
  fn default() -> Self { Self { channels: Mutex::new(HashMap::new()) } }
}

impl<T> Topics<T> {
  pub fn new() -> Self { Self::default() }

  pub fn subscribe(
    &self,
    topic: impl Into<String>,
    callback: impl Fn(&T) + Send + Sync + 'static,
  ) -> SubscriptionId {
    let id = SubscriptionId(Uuid::new_v4());
    self
      .channels()
      .entry(topic.into())
      .or_default()
      .push((id, Arc::new(callback)));
    id
  }

  /// Remove a subscription. Returns `None` if it was already removed.
  pub fn unsubscribe(&self, id: SubscriptionId) -> Option<Subscription<T>> {
    let mut channels = self.channels();
    let (topic, pos) = channels.iter().find_map(|(topic, subs)| {
      subs
        .iter()
        .position(|(sid, _)| *sid == id)
        .map(|pos| (topic.clone(), pos))
    })?;

    let subs = channels.get_mut(&topic)?;
    let (_, callback) = subs.remove(pos);
    if subs.is_empty() {
      channels.remove(&topic);
    }
    Some(Subscription { id, topic, callback })
  }

  /// Invoke every callback on `topic` in subscription order. Returns how many
  /// ran.
  pub fn publish(&self, topic: &str, payload: &T) -> usize {
    let callbacks: Vec<Callback<T>> = match self.channels().get(topic) {
      Some(subs) => subs.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
      None => return 0,
    };
    for cb in &callbacks {
      cb(payload);
    }
    callbacks.len()
  }

  pub fn subscriber_count(&self, topic: &str) -> usize {
    self.channels().get(topic).map_or(0, Vec::len)
  }

  fn channels(
    &self,
  ) -> MutexGuard<'_, HashMap<String, Vec<(SubscriptionId, Callback<T>)>>> {
    self.channels.lock().unwrap_or_else(|e| e.into_inner())
  }
}
