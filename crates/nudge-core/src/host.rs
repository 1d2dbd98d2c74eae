//! Host-side collaborators the engine consults but does not own.

/// Contextual evidence about the page being inspected.
pub trait ContextProbe: Send + Sync {
  /// `true` when showing a promotion here would be inappropriate, e.g. the
  /// product is already active in the inspected frame.
  fn conflict_signal(&self) -> bool;
}

/// What the host knows about the active page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageContext {
  pub product_detected: bool,
}

impl ContextProbe for PageContext {
  fn conflict_signal(&self) -> bool { self.product_detected }
}

/// Re-renders the toolbar indicator for the active surface. Fire-and-forget.
pub trait IndicatorRefresh: Send + Sync {
  fn refresh_indicator(&self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRefresh;

impl IndicatorRefresh for NoopRefresh {
  fn refresh_indicator(&self) {}
}
