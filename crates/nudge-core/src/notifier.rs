//! [`Notifier`], the caller-facing API: current notification lookup and
//! dismissal.
//!
//! The notifier owns one [`Scheduler`] session behind an async mutex, so every
//! read and write of the viewed state is serialised. Delayed dismissals run on
//! a spawned tokio task; at most one is pending at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::AbortHandle;

use crate::{
  clock::{Clock, SystemClock},
  config::SchedulerConfig,
  host::{ContextProbe, IndicatorRefresh, NoopRefresh},
  locale::{EnvLocale, LocaleProvider},
  registry::Registry,
  scheduler::{Check, ResolvedNotification, Scheduler, SchedulerState},
  store::KeyValueStore,
  viewed::{ViewedState, ViewedStateStore},
};

// ─── Host ────────────────────────────────────────────────────────────────────

/// The host-side collaborators a notifier talks to.
#[derive(Clone)]
pub struct Host {
  pub clock:     Arc<dyn Clock>,
  pub locale:    Arc<dyn LocaleProvider>,
  pub refresher: Arc<dyn IndicatorRefresh>,
}

impl Default for Host {
  /// System clock, POSIX locale environment, no indicator.
  fn default() -> Self {
    Self {
      clock:     Arc::new(SystemClock),
      locale:    Arc::new(EnvLocale),
      refresher: Arc::new(NoopRefresh),
    }
  }
}

// ─── Notifier ────────────────────────────────────────────────────────────────

/// All clones share one session.
pub struct Notifier<S> {
  inner: Arc<Inner<S>>,
}

impl<S> Clone for Notifier<S> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

struct Inner<S> {
  scheduler: tokio::sync::Mutex<Scheduler<S>>,
  host:      Host,
  pending:   Mutex<PendingDismissal>,
}

/// The single delayed dismissal slot. `generation` lets a timer that woke up
/// late notice it was replaced before it could be aborted.
#[derive(Default)]
struct PendingDismissal {
  generation: u64,
  task:       Option<AbortHandle>,
}

impl<S: KeyValueStore + 'static> Notifier<S> {
  /// Start a session. The locale is read once, here.
  pub fn new(
    store: Arc<S>,
    registry: &Registry,
    config: SchedulerConfig,
    host: Host,
  ) -> Self {
    let locale = host.locale.current_locale();
    let scheduler = Scheduler::new(
      registry,
      locale.as_deref(),
      ViewedStateStore::new(store),
      config,
      host.clock.now(),
    );
    Self {
      inner: Arc::new(Inner {
        scheduler: tokio::sync::Mutex::new(scheduler),
        host,
        pending: Mutex::new(PendingDismissal::default()),
      }),
    }
  }

  /// The notification to display right now, if any.
  ///
  /// `context` describes the inspected page; a conflicting signal suppresses
  /// every campaign for the rest of the session.
  pub async fn get_current_notification(
    &self,
    context: Option<&dyn ContextProbe>,
  ) -> Option<ResolvedNotification> {
    let now = self.inner.host.clock.now();
    let check = self
      .inner
      .scheduler
      .lock()
      .await
      .check_eligibility(context, now)
      .await;

    if let Check::Suppressed { purged } = &check
      && *purged > 0
    {
      self.inner.host.refresher.refresh_indicator();
    }
    check.into_notification()
  }

  /// Mark the current notification viewed.
  ///
  /// With `immediate == false` the dismissal runs after the configured delay,
  /// replacing any dismissal already pending. An immediate dismissal also
  /// cancels a pending one.
  pub async fn set_notification_viewed(&self, immediate: bool) {
    if immediate {
      self.cancel_pending();
      self.dismiss_now().await;
      return;
    }

    let delay = self.inner.scheduler.lock().await.config().dismiss_delay;
    let mut pending = self.pending();
    pending.generation += 1;
    let generation = pending.generation;

    let this = self.clone();
    let task = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      // Take the session before releasing the slot, so anyone who sees the
      // slot empty and then locks the session observes the dismissal.
      let mut scheduler = this.inner.scheduler.lock().await;
      {
        let mut pending = this.pending();
        if pending.generation != generation || pending.task.is_none() {
          return;
        }
        pending.task = None;
      }
      this.dismiss(&mut scheduler).await;
    });

    if let Some(previous) = pending.task.replace(task.abort_handle()) {
      tracing::debug!("rescheduling pending dismissal");
      previous.abort();
    }
  }

  /// Whether a delayed dismissal is waiting to run.
  pub fn has_pending_dismissal(&self) -> bool { self.pending().task.is_some() }

  pub async fn state(&self) -> SchedulerState {
    self.inner.scheduler.lock().await.state().clone()
  }

  /// What is persisted right now.
  pub async fn viewed_state(&self) -> ViewedState {
    let scheduler = self.inner.scheduler.lock().await;
    scheduler.store().load().await
  }

  // ── Internals ───────────────────────────────────────────────────────────

  async fn dismiss_now(&self) {
    let mut scheduler = self.inner.scheduler.lock().await;
    self.dismiss(&mut scheduler).await;
  }

  async fn dismiss(&self, scheduler: &mut Scheduler<S>) {
    if scheduler.dismiss_current().await.is_some() {
      self.inner.host.refresher.refresh_indicator();
    }
  }

  fn cancel_pending(&self) {
    if let Some(task) = self.pending().task.take() {
      tracing::debug!("cancelling pending dismissal");
      task.abort();
    }
  }

  fn pending(&self) -> MutexGuard<'_, PendingDismissal> {
    self.inner.pending.lock().unwrap_or_else(|e| e.into_inner())
  }
}
