//! `nudge`: drive the notification engine from the command line.
//!
//! Each invocation is one session: it opens the SQLite store, loads the
//! campaign table and runs a single command against it.
//!
//! # Usage
//!
//! ```text
//! nudge --config nudge.toml check
//! nudge check --product-detected
//! nudge dismiss --delay
//! nudge status
//! nudge campaigns --active
//! nudge pref set show_banner false
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use nudge_core::{
  Notifier,
  host::{IndicatorRefresh, PageContext},
  locale::{EnvLocale, LocaleProvider, resolve},
  notifier::Host,
  prefs::{PrefValue, Preferences},
  registry::Registry,
};
use nudge_store_sqlite::SqliteStore;
use serde_json::json;
use settings::AppConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Key prefix for preferences written by this tool.
const PREF_BRANCH: &str = "extensions.nudge.";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Promotional notification scheduler")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "nudge.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the notification that should be shown now, or `null`.
  Check {
    /// The inspected page already runs the product.
    #[arg(long)]
    product_detected: bool,
  },
  /// Check, then mark the current notification viewed.
  Dismiss {
    /// Wait for the dismissal delay instead of dismissing immediately.
    #[arg(long)]
    delay: bool,
  },
  /// Print the persisted viewed state.
  Status,
  /// List loaded campaigns with the text resolved for the current locale.
  Campaigns {
    /// Only campaigns whose window contains the current time.
    #[arg(long)]
    active: bool,
  },
  /// Read or write preferences.
  Pref {
    #[command(subcommand)]
    action: PrefAction,
  },
}

#[derive(Subcommand)]
enum PrefAction {
  Get { name: String },
  /// `true`/`false` and integers are stored typed; anything else as text.
  Set { name: String, value: String },
  Remove { name: String },
  /// Remove every preference this tool wrote.
  Clear,
}

// ─── Host adapters ────────────────────────────────────────────────────────────

/// Stands in for the toolbar: there is no icon to redraw in a terminal.
struct LogRefresh;

impl IndicatorRefresh for LogRefresh {
  fn refresh_indicator(&self) { tracing::info!("indicator refresh requested"); }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  let store_path = cfg.store_path();
  if let Some(dir) = store_path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let locale: Arc<dyn LocaleProvider> = match &cfg.locale {
    Some(tag) => Arc::new(nudge_core::locale::FixedLocale::new(tag.clone())),
    None => Arc::new(EnvLocale),
  };
  let registry = Registry::load(cfg.campaign_specs());
  tracing::debug!(campaigns = registry.len(), "campaign table loaded");

  let host = Host {
    locale: Arc::clone(&locale),
    refresher: Arc::new(LogRefresh),
    ..Host::default()
  };

  match cli.command {
    Command::Check { product_detected } => {
      let notifier = Notifier::new(store, &registry, cfg.scheduler, host);
      let page = PageContext { product_detected };
      let current = notifier.get_current_notification(Some(&page)).await;
      print_json(&current)?;
    }

    Command::Dismiss { delay } => {
      let notifier = Notifier::new(store, &registry, cfg.scheduler, host);
      let Some(current) = notifier.get_current_notification(None).await else {
        tracing::info!("no current notification");
        return Ok(());
      };
      notifier.set_notification_viewed(!delay).await;
      if delay {
        tracing::info!(
          id = current.id(),
          secs = cfg.scheduler.dismiss_delay.as_secs(),
          "waiting for delayed dismissal"
        );
        while notifier.has_pending_dismissal() {
          tokio::time::sleep(Duration::from_millis(200)).await;
        }
      }
      print_json(&notifier.viewed_state().await)?;
    }

    Command::Status => {
      let notifier = Notifier::new(store, &registry, cfg.scheduler, host);
      print_json(&notifier.viewed_state().await)?;
    }

    Command::Campaigns { active } => {
      let now = Utc::now();
      let tag = locale.current_locale().unwrap_or_default();
      let campaigns: Vec<_> = if active {
        registry.list_active(now).collect()
      } else {
        registry.iter().collect()
      };
      let listing: Vec<_> = campaigns
        .into_iter()
        .map(|c| {
          json!({
            "id": c.id,
            "active_from": c.active_from,
            "active_to": c.active_to,
            "active_now": c.is_active_at(now),
            "text": resolve(c, &tag),
          })
        })
        .collect();
      print_json(&listing)?;
    }

    Command::Pref { action } => {
      let prefs = Preferences::new(store, PREF_BRANCH);
      match action {
        PrefAction::Get { name } => {
          let value = prefs.get(&name).await?;
          println!("{}", value.map(|v| v.to_string()).unwrap_or_default());
        }
        PrefAction::Set { name, value } => {
          prefs.set(&name, parse_pref(&value)).await?;
        }
        PrefAction::Remove { name } => prefs.remove(&name).await?,
        PrefAction::Clear => {
          let removed = prefs.clear().await?;
          tracing::info!(removed, "preferences cleared");
        }
      }
    }
  }

  Ok(())
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn parse_pref(raw: &str) -> PrefValue {
  match raw {
    "true" => PrefValue::Bool(true),
    "false" => PrefValue::Bool(false),
    _ => raw
      .parse::<i64>()
      .map(PrefValue::Int)
      .unwrap_or_else(|_| PrefValue::String(raw.to_owned())),
  }
}
