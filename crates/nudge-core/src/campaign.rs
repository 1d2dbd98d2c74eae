//! Campaign types: the static definitions of promotional notifications.
//!
//! A campaign is immutable once loaded. Configuration arrives as a
//! [`CampaignSpec`] with string dates; [`CampaignSpec::validate`] turns it into
//! a [`Campaign`] or explains why it must be dropped.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Text ────────────────────────────────────────────────────────────────────

/// One localized rendering of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextVariant {
  pub title:       String,
  #[serde(alias = "desc")]
  pub description: String,
  #[serde(alias = "btn")]
  pub button_text: String,
}

impl TextVariant {
  pub fn new(
    title: impl Into<String>,
    description: impl Into<String>,
    button_text: impl Into<String>,
  ) -> Self {
    Self {
      title:       title.into(),
      description: description.into(),
      button_text: button_text.into(),
    }
  }
}

// ─── Presentation ────────────────────────────────────────────────────────────

/// How the host should present the banner and its toolbar badge.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PresentationType {
  /// Badge pulses to draw attention.
  Animated,
  #[default]
  Static,
}

// ─── Campaign ────────────────────────────────────────────────────────────────

/// A validated campaign definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
  pub id:           String,
  /// Text variants keyed by locale tag (`en`, `en-US`, ...).
  pub locales:      BTreeMap<String, TextVariant>,
  pub url:          String,
  /// Inclusive start of the validity window.
  pub active_from:  DateTime<Utc>,
  /// Exclusive end of the validity window.
  pub active_to:    DateTime<Utc>,
  pub presentation: PresentationType,
  pub badge_text:   String,
  pub badge_color:  String,
}

impl Campaign {
  /// Whether `now` falls inside `[active_from, active_to)`.
  pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
    self.active_from <= now && now < self.active_to
  }

  /// Whether the window has closed for good.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now >= self.active_to
  }
}

// ─── CampaignSpec ────────────────────────────────────────────────────────────

/// Unvalidated campaign as it appears in configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSpec {
  pub id:           String,
  #[serde(default)]
  pub locales:      BTreeMap<String, TextVariant>,
  pub url:          String,
  #[serde(alias = "from")]
  pub active_from:  String,
  #[serde(alias = "to")]
  pub active_to:    String,
  #[serde(default, alias = "type")]
  pub presentation: PresentationType,
  #[serde(default)]
  pub badge_text:   String,
  #[serde(default, alias = "badge_bg_color")]
  pub badge_color:  String,
}

impl CampaignSpec {
  /// Parse dates and check the window; invalid campaigns must never be shown.
  pub fn validate(self) -> Result<Campaign> {
    if self.id.trim().is_empty() {
      return Err(Error::InvalidCampaign {
        id:     self.id,
        reason: "empty id".into(),
      });
    }

    let active_from = parse_date(&self.id, &self.active_from)?;
    let active_to = parse_date(&self.id, &self.active_to)?;
    if active_from >= active_to {
      return Err(Error::InvalidCampaign {
        id:     self.id,
        reason: format!("window {active_from} .. {active_to} is empty"),
      });
    }

    if self.locales.is_empty() {
      return Err(Error::InvalidCampaign {
        id:     self.id,
        reason: "no localized text".into(),
      });
    }

    Ok(Campaign {
      id: self.id,
      locales: self.locales,
      url: self.url,
      active_from,
      active_to,
      presentation: self.presentation,
      badge_text: self.badge_text,
      badge_color: self.badge_color,
    })
  }
}

/// Accepts RFC 3339, `2019-11-29 00:00:00` and `29 November 2019 00:00:00`.
/// Forms without an offset are read as UTC.
pub fn parse_date(id: &str, value: &str) -> Result<DateTime<Utc>> {
  let value = value.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
    return Ok(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%d %H:%M:%S", "%d %B %Y %H:%M:%S"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    .map(|naive| naive.and_utc())
    .ok_or_else(|| Error::InvalidDate {
      id:    id.to_owned(),
      value: value.to_owned(),
    })
}

// ─── Built-in table ──────────────────────────────────────────────────────────

/// The campaign table shipped with the extension.
pub fn builtin_specs() -> Vec<CampaignSpec> {
  let locales = [
    ("en", "BLACK FRIDAY SALE ", "(save up to 60%)", "Upgrade protection"),
    ("de", "BLACK FRIDAY SALE", "(bis zu 60% Rabatt)", "Den Schutz upgraden"),
    ("ru", "ЧЁРНАЯ ПЯТНИЦА:", "СКИДКИ до 60%!", "Улучшить защиту"),
    ("fr", "PROMO BLACK FRIDAY", "(jusqu’à -60%)", "Améliorer la protection"),
    ("it", "SCONTI BLACK FRIDAY", "(fino a -60%)", "Migliora la protezione"),
    ("ja", "BLACK FRIDAY SALE", "(最大60%OFF)", "パワーアップ"),
    ("ko", "BLACK FRIDAY SALE", "(60% 할인)", "보호 업그레이드"),
  ]
  .into_iter()
  .map(|(tag, title, desc, btn)| (tag.to_owned(), TextVariant::new(title, desc, btn)))
  .collect();

  vec![CampaignSpec {
    id: "blackFriday2019".into(),
    locales,
    url: "https://adguard.com/forward.html?action=bf2019_notify&from=popup&app=browser_extension"
      .into(),
    active_from: "29 November 2019 00:00:00".into(),
    active_to: "2 December 2019 00:00:00".into(),
    presentation: PresentationType::Animated,
    badge_text: "%".into(),
    badge_color: "#ff0000".into(),
  }]
}
