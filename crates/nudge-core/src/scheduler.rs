//! The eligibility scheduler. Decides, per invocation, which notification (if
//! any) is current.
//!
//! A [`Scheduler`] is one session's worth of state. It holds at most one
//! candidate at a time and moves between three states:
//!
//! - [`SchedulerState::Idle`]: nothing to show.
//! - [`SchedulerState::Holding`]: a candidate was selected and awaits dismissal.
//! - [`SchedulerState::Suppressed`]: a conflicting signal purged every campaign
//!   for the rest of the session.
//!
//! Checks are rate-limited twice: nothing is shown within `min_period` of the
//! first check ever made on the profile, and a full scan is reused for
//! `check_timeout` before the registry is walked again. Only the first limit
//! outlives the session.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  campaign::{Campaign, TextVariant},
  config::SchedulerConfig,
  host::ContextProbe,
  locale::resolve,
  registry::Registry,
  store::KeyValueStore,
  viewed::ViewedStateStore,
};

// ─── Public types ────────────────────────────────────────────────────────────

/// A campaign with the text variant chosen for the session's locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNotification {
  pub campaign:      Campaign,
  pub resolved_text: TextVariant,
  pub viewed:        bool,
}

impl ResolvedNotification {
  pub fn id(&self) -> &str { &self.campaign.id }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
  Idle,
  Holding(ResolvedNotification),
  Suppressed,
}

/// What a single eligibility check decided, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
  /// Inside the quiet period; nothing was consulted.
  RateLimited,
  /// The session is (now) suppressed. `purged` counts campaigns newly marked
  /// viewed by this call.
  Suppressed { purged: usize },
  /// The previous scan is recent enough; its result is reused.
  Held(Option<ResolvedNotification>),
  /// A full scan ran.
  Scanned(Option<ResolvedNotification>),
}

impl Check {
  pub fn into_notification(self) -> Option<ResolvedNotification> {
    match self {
      Self::Held(n) | Self::Scanned(n) => n,
      Self::RateLimited | Self::Suppressed { .. } => None,
    }
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

pub struct Scheduler<S> {
  store:      ViewedStateStore<S>,
  config:     SchedulerConfig,
  /// Locale-resolved, unexpired campaigns in declaration order.
  candidates: Vec<ResolvedNotification>,
  /// Session copy of the persisted quiet-period anchor; loaded on first check.
  anchor:     Option<DateTime<Utc>>,
  last_scan:  Option<DateTime<Utc>>,
  state:      SchedulerState,
}

impl<S: KeyValueStore> Scheduler<S> {
  /// Resolve every campaign for `locale` once. Campaigns without a matching
  /// variant, or already expired at `now`, never become candidates.
  pub fn new(
    registry: &Registry,
    locale: Option<&str>,
    store: ViewedStateStore<S>,
    config: SchedulerConfig,
    now: DateTime<Utc>,
  ) -> Self {
    let tag = locale.unwrap_or_default();
    let candidates: Vec<_> = registry
      .iter()
      .filter(|c| !c.is_expired_at(now))
      .filter_map(|c| {
        let text = resolve(c, tag)?;
        Some(ResolvedNotification {
          campaign:      c.clone(),
          resolved_text: text.clone(),
          viewed:        false,
        })
      })
      .collect();

    tracing::debug!(
      locale = tag,
      loaded = registry.len(),
      eligible = candidates.len(),
      "scheduler initialised"
    );

    Self {
      store,
      config,
      candidates,
      anchor: None,
      last_scan: None,
      state: SchedulerState::Idle,
    }
  }

  pub fn state(&self) -> &SchedulerState { &self.state }

  pub fn config(&self) -> &SchedulerConfig { &self.config }

  pub fn store(&self) -> &ViewedStateStore<S> { &self.store }

  /// Ids still in the running for this session.
  pub fn candidate_ids(&self) -> impl Iterator<Item = &str> + '_ {
    self.candidates.iter().map(|c| c.id())
  }

  pub fn current(&self) -> Option<&ResolvedNotification> {
    match &self.state {
      SchedulerState::Holding(n) => Some(n),
      _ => None,
    }
  }

  /// Run one eligibility check at `now`.
  pub async fn check_eligibility(
    &mut self,
    context: Option<&dyn ContextProbe>,
    now: DateTime<Utc>,
  ) -> Check {
    let anchor = match self.anchor {
      Some(anchor) => anchor,
      None => {
        let anchor = self.store.get_last_check_time(now).await;
        self.anchor = Some(anchor);
        anchor
      }
    };
    if elapsed(anchor, now) < self.config.min_period {
      tracing::trace!(%anchor, %now, "inside quiet period");
      return Check::RateLimited;
    }

    if self.state == SchedulerState::Suppressed {
      return Check::Suppressed { purged: 0 };
    }

    if context.is_some_and(|c| c.conflict_signal()) {
      let purged = self.suppress().await;
      return Check::Suppressed { purged };
    }

    if let Some(last_scan) = self.last_scan
      && elapsed(last_scan, now) <= self.config.check_timeout
    {
      return Check::Held(self.held_at(now));
    }

    Check::Scanned(self.scan(now).await)
  }

  /// Mark the held candidate viewed and go idle. Returns the id if this call
  /// marked it; `None` if nothing is held or it was already viewed.
  pub async fn dismiss_current(&mut self) -> Option<String> {
    let id = self.current()?.id().to_owned();
    if self.store.is_viewed(&id).await {
      tracing::debug!(id = %id, "held notification already viewed");
      return None;
    }
    self.store.mark_viewed(&id).await;
    self.state = SchedulerState::Idle;
    tracing::info!(id = %id, "notification marked viewed");
    Some(id)
  }

  // ── Transitions ─────────────────────────────────────────────────────────

  /// One-way purge: everything left is marked viewed and dropped.
  async fn suppress(&mut self) -> usize {
    let purged = self
      .store
      .mark_all_viewed(self.candidates.iter().map(|c| c.campaign.id.as_str()))
      .await;
    self.candidates.clear();
    self.state = SchedulerState::Suppressed;
    tracing::info!(purged, "conflicting signal, notifications suppressed");
    purged
  }

  /// The held candidate, unless its window closed since the scan.
  fn held_at(&mut self, now: DateTime<Utc>) -> Option<ResolvedNotification> {
    let held = self.current()?;
    if held.campaign.is_active_at(now) {
      return Some(held.clone());
    }
    tracing::debug!(id = held.id(), "held notification left its window");
    self.state = SchedulerState::Idle;
    None
  }

  async fn scan(&mut self, now: DateTime<Utc>) -> Option<ResolvedNotification> {
    self.last_scan = Some(now);
    self.store.record_scan(now).await;

    self.candidates.retain(|c| !c.campaign.is_expired_at(now));
    let viewed = self.store.viewed_ids().await;
    let found = self
      .candidates
      .iter()
      .find(|c| c.campaign.is_active_at(now) && !viewed.contains(&c.campaign.id))
      .cloned();

    match &found {
      Some(n) => {
        tracing::debug!(id = n.id(), "scan selected notification");
        self.state = SchedulerState::Holding(n.clone());
      }
      None => {
        tracing::debug!(remaining = self.candidates.len(), "scan found nothing");
        self.state = SchedulerState::Idle;
      }
    }
    found
  }
}

/// Time from `since` to `now`; zero if the clock went backwards.
fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
  (now - since).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::{TimeDelta, TimeZone};

  use super::*;
  use crate::{
    campaign::{CampaignSpec, PresentationType},
    host::PageContext,
    memory::MemoryStore,
    viewed::FIRST_SEEN_KEY,
  };

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 11, 29, 0, 0, 0).unwrap() }

  fn spec(id: &str, from: DateTime<Utc>, to: DateTime<Utc>, locales: &[&str]) -> CampaignSpec {
    CampaignSpec {
      id:           id.into(),
      locales:      locales
        .iter()
        .map(|l| (l.to_string(), TextVariant::new(format!("{id} {l}"), "d", "b")))
        .collect(),
      url:          format!("https://example.com/{id}"),
      active_from:  from.to_rfc3339(),
      active_to:    to.to_rfc3339(),
      presentation: PresentationType::Static,
      badge_text:   String::new(),
      badge_color:  String::new(),
    }
  }

  /// A store whose quiet period ended long ago.
  async fn seasoned_store() -> Arc<MemoryStore> {
    let kv = Arc::new(MemoryStore::new());
    let long_ago = (t0() - TimeDelta::days(30)).timestamp_millis();
    kv.set_item(FIRST_SEEN_KEY, long_ago.into()).await.unwrap();
    kv
  }

  fn scheduler(
    kv: &Arc<MemoryStore>,
    specs: Vec<CampaignSpec>,
    locale: &str,
    now: DateTime<Utc>,
  ) -> Scheduler<MemoryStore> {
    Scheduler::new(
      &Registry::load(specs),
      Some(locale),
      ViewedStateStore::new(Arc::clone(kv)),
      SchedulerConfig::default(),
      now,
    )
  }

  fn ids(check: Check) -> Option<String> {
    check.into_notification().map(|n| n.campaign.id)
  }

  const CONFLICT: PageContext = PageContext { product_detected: true };

  #[tokio::test]
  async fn returns_campaign_inside_window_only() {
    let kv = seasoned_store().await;
    let end = t0() + TimeDelta::milliseconds(1000);
    let mut s = scheduler(&kv, vec![spec("c1", t0(), end, &["en"])], "en", t0());

    let now = t0() + TimeDelta::milliseconds(500);
    assert_eq!(ids(s.check_eligibility(None, now).await).as_deref(), Some("c1"));

    // Within the reuse window, but the held campaign has expired.
    let now = t0() + TimeDelta::milliseconds(1500);
    assert_eq!(s.check_eligibility(None, now).await, Check::Held(None));
    assert_eq!(s.state(), &SchedulerState::Idle);
  }

  #[tokio::test]
  async fn first_declared_campaign_wins() {
    let kv = seasoned_store().await;
    let end = t0() + TimeDelta::days(3);
    let mut s = scheduler(
      &kv,
      vec![spec("c1", t0(), end, &["en"]), spec("c2", t0(), end, &["en"])],
      "en",
      t0(),
    );

    let check = s.check_eligibility(None, t0() + TimeDelta::hours(1)).await;
    assert_eq!(ids(check).as_deref(), Some("c1"));
    assert!(matches!(s.state(), SchedulerState::Holding(n) if n.id() == "c1"));
  }

  #[tokio::test]
  async fn unmatched_locale_and_expired_campaigns_are_filtered_at_load() {
    let kv = seasoned_store().await;
    let s = scheduler(
      &kv,
      vec![
        spec("ru-only", t0(), t0() + TimeDelta::days(3), &["ru"]),
        spec("gone", t0() - TimeDelta::days(9), t0() - TimeDelta::days(2), &["en"]),
        spec("regional", t0(), t0() + TimeDelta::days(3), &["en"]),
      ],
      "en-GB",
      t0(),
    );
    assert_eq!(s.candidate_ids().collect::<Vec<_>>(), ["regional"]);
  }

  #[tokio::test]
  async fn missing_locale_yields_nothing() {
    let kv = seasoned_store().await;
    let registry = Registry::load([spec("c1", t0(), t0() + TimeDelta::days(1), &["en"])]);
    let mut s = Scheduler::new(
      &registry,
      None,
      ViewedStateStore::new(kv),
      SchedulerConfig::default(),
      t0(),
    );
    assert_eq!(s.check_eligibility(None, t0() + TimeDelta::hours(1)).await, Check::Scanned(None));
  }

  #[tokio::test]
  async fn fresh_install_waits_out_the_quiet_period() {
    let kv = Arc::new(MemoryStore::new());
    let mut s = scheduler(&kv, vec![spec("c1", t0(), t0() + TimeDelta::days(3), &["en"])], "en", t0());

    let first = t0() + TimeDelta::minutes(1);
    assert_eq!(s.check_eligibility(None, first).await, Check::RateLimited);
    assert_eq!(
      s.check_eligibility(None, first + TimeDelta::minutes(10)).await,
      Check::RateLimited
    );
    assert_eq!(s.state(), &SchedulerState::Idle);

    let later = first + TimeDelta::minutes(30);
    assert_eq!(ids(s.check_eligibility(None, later).await).as_deref(), Some("c1"));
  }

  #[tokio::test]
  async fn scan_result_is_reused_until_check_timeout() {
    let kv = seasoned_store().await;
    let start = t0() + TimeDelta::hours(1);
    let mut s = scheduler(&kv, vec![spec("c2", start + TimeDelta::minutes(5), t0() + TimeDelta::days(3), &["en"])], "en", t0());

    assert_eq!(s.check_eligibility(None, start).await, Check::Scanned(None));
    // c2 opens, but the empty scan result is still fresh.
    assert_eq!(s.check_eligibility(None, start + TimeDelta::minutes(10)).await, Check::Held(None));
    let check = s.check_eligibility(None, start + TimeDelta::minutes(11)).await;
    assert!(matches!(check, Check::Scanned(Some(ref n)) if n.id() == "c2"));

    let state = s.store().load().await;
    assert_eq!(state.last_check, Some(start + TimeDelta::minutes(11)));
  }

  #[tokio::test]
  async fn viewed_campaigns_are_skipped() {
    let kv = seasoned_store().await;
    let end = t0() + TimeDelta::days(3);
    let mut s = scheduler(
      &kv,
      vec![spec("c1", t0(), end, &["en"]), spec("c2", t0(), end, &["en"])],
      "en",
      t0(),
    );
    s.store().mark_viewed("c1").await;

    let check = s.check_eligibility(None, t0() + TimeDelta::hours(1)).await;
    assert_eq!(ids(check).as_deref(), Some("c2"));
  }

  #[tokio::test]
  async fn dismissal_prevents_reselection() {
    let kv = seasoned_store().await;
    let end = t0() + TimeDelta::days(3);
    let mut s = scheduler(&kv, vec![spec("c1", t0(), end, &["en"])], "en", t0());

    let now = t0() + TimeDelta::hours(1);
    assert!(s.check_eligibility(None, now).await.into_notification().is_some());
    assert_eq!(s.dismiss_current().await.as_deref(), Some("c1"));
    assert_eq!(s.state(), &SchedulerState::Idle);
    assert_eq!(s.dismiss_current().await, None);

    let rescan = now + TimeDelta::minutes(11);
    assert_eq!(s.check_eligibility(None, rescan).await, Check::Scanned(None));
  }

  #[tokio::test]
  async fn conflicting_signal_purges_permanently() {
    let kv = seasoned_store().await;
    let end = t0() + TimeDelta::days(3);
    let mut s = scheduler(
      &kv,
      vec![
        spec("c1", t0(), end, &["en"]),
        spec("c2", t0(), end, &["en"]),
        spec("future", end, end + TimeDelta::days(1), &["en"]),
      ],
      "en",
      t0(),
    );
    let now = t0() + TimeDelta::hours(1);
    assert!(s.check_eligibility(None, now).await.into_notification().is_some());

    let check = s.check_eligibility(Some(&CONFLICT), now).await;
    assert_eq!(check, Check::Suppressed { purged: 3 });
    assert_eq!(s.state(), &SchedulerState::Suppressed);
    assert_eq!(s.candidate_ids().count(), 0);
    assert_eq!(s.store().viewed_ids().await, ["c1", "c2", "future"]);

    // Signal gone, rescan due: still nothing.
    let later = now + TimeDelta::hours(1);
    assert_eq!(s.check_eligibility(None, later).await, Check::Suppressed { purged: 0 });

    // A new session over the same store sees them as viewed.
    let mut fresh = scheduler(&kv, vec![spec("c1", t0(), end, &["en"])], "en", later);
    assert_eq!(fresh.check_eligibility(None, later).await, Check::Scanned(None));
  }

  #[tokio::test]
  async fn conflict_is_ignored_during_quiet_period() {
    let kv = Arc::new(MemoryStore::new());
    let mut s = scheduler(&kv, vec![spec("c1", t0(), t0() + TimeDelta::days(3), &["en"])], "en", t0());
    assert_eq!(s.check_eligibility(Some(&CONFLICT), t0()).await, Check::RateLimited);
    assert!(s.store().viewed_ids().await.is_empty());
  }
}
