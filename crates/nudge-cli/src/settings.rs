//! Application configuration, layered from a TOML file and `NUDGE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use nudge_core::{
  campaign::{CampaignSpec, builtin_specs},
  config::SchedulerConfig,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Locale tag; the POSIX environment is consulted when unset.
  #[serde(default)]
  pub locale:     Option<String>,
  #[serde(default)]
  pub scheduler:  SchedulerConfig,
  #[serde(default)]
  pub campaigns:  Vec<CampaignSpec>,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/nudge/state.db") }

impl AppConfig {
  /// Read `path` (optional) and the environment. `NUDGE_STORE_PATH` and
  /// `NUDGE_SCHEDULER__MIN_PERIOD` style names are recognised.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("NUDGE").separator("__"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")
  }

  /// Configured campaigns, or the built-in table when none are configured.
  pub fn campaign_specs(&self) -> Vec<CampaignSpec> {
    if self.campaigns.is_empty() {
      builtin_specs()
    } else {
      self.campaigns.clone()
    }
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand `~` and `~/...` against `$HOME`. Other paths pass through.
fn expand_tilde(path: &Path) -> PathBuf {
  let Ok(rest) = path.strip_prefix("~") else {
    return path.to_path_buf();
  };
  match std::env::var_os("HOME") {
    Some(home) => PathBuf::from(home).join(rest),
    None => path.to_path_buf(),
  }
}
