//! Timing knobs for the scheduler and dismissal handler.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Durations are written as whole seconds in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  /// Quiet period after the last check before anything may be shown.
  #[serde(with = "secs")]
  pub min_period:    Duration,
  /// How long a scan result is reused before scanning again.
  #[serde(with = "secs")]
  pub check_timeout: Duration,
  /// Delay applied by a non-immediate dismissal.
  #[serde(with = "secs")]
  pub dismiss_delay: Duration,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      min_period:    Duration::from_secs(30 * 60),
      check_timeout: Duration::from_secs(10 * 60),
      dismiss_delay: Duration::from_secs(30),
    }
  }
}

mod secs {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_secs)
  }
}
