//! Locale resolution: picking the best text variant for a runtime locale tag.

use std::collections::BTreeMap;

use crate::campaign::{Campaign, TextVariant};

/// Look `tag` up in a map keyed by locale tags.
///
/// Matching order: the exact tag (`en-US`), then its primary subtag (`en`).
/// An empty tag matches nothing.
pub fn match_locale<'a, V>(
  entries: &'a BTreeMap<String, V>,
  tag: &str,
) -> Option<&'a V> {
  if tag.is_empty() {
    return None;
  }
  if let Some(v) = entries.get(tag) {
    return Some(v);
  }
  let primary = tag.split('-').next().filter(|p| !p.is_empty())?;
  entries.get(primary)
}

/// The text variant of `campaign` for `tag`, if any.
pub fn resolve<'a>(campaign: &'a Campaign, tag: &str) -> Option<&'a TextVariant> {
  match_locale(&campaign.locales, tag)
}

// ─── Providers ───────────────────────────────────────────────────────────────

/// Source of the runtime locale tag.
pub trait LocaleProvider: Send + Sync {
  fn current_locale(&self) -> Option<String>;
}

/// A locale fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct FixedLocale(pub Option<String>);

impl FixedLocale {
  pub fn new(tag: impl Into<String>) -> Self { Self(Some(tag.into())) }
}

impl LocaleProvider for FixedLocale {
  fn current_locale(&self) -> Option<String> { self.0.clone() }
}

/// Reads the POSIX locale environment (`LC_ALL`, `LC_MESSAGES`, `LANG`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvLocale;

impl LocaleProvider for EnvLocale {
  fn current_locale(&self) -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
      .iter()
      .filter_map(|var| std::env::var(var).ok())
      .find(|v| !v.is_empty())
      .and_then(|v| posix_to_tag(&v))
  }
}

/// `en_US.UTF-8@euro` → `en-US`. `C` and `POSIX` carry no language.
pub fn posix_to_tag(value: &str) -> Option<String> {
  let base = value.split(['.', '@']).next().unwrap_or_default();
  if base.is_empty() || base == "C" || base == "POSIX" {
    return None;
  }
  Some(base.replace('_', "-"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table() -> BTreeMap<String, &'static str> {
    [("en".to_owned(), "en"), ("pt-BR".to_owned(), "pt-BR")].into()
  }

  #[test]
  fn exact_match_wins() {
    assert_eq!(match_locale(&table(), "pt-BR"), Some(&"pt-BR"));
  }

  #[test]
  fn falls_back_to_primary_subtag() {
    assert_eq!(match_locale(&table(), "en-US"), Some(&"en"));
    assert_eq!(match_locale(&table(), "en"), Some(&"en"));
  }

  #[test]
  fn no_match_or_empty_tag() {
    assert_eq!(match_locale(&table(), "pt-PT"), None);
    assert_eq!(match_locale(&table(), "de"), None);
    assert_eq!(match_locale(&table(), ""), None);
    assert_eq!(match_locale(&table(), "-US"), None);
  }

  #[test]
  fn posix_values_become_tags() {
    assert_eq!(posix_to_tag("en_US.UTF-8").as_deref(), Some("en-US"));
    assert_eq!(posix_to_tag("de_DE@euro").as_deref(), Some("de-DE"));
    assert_eq!(posix_to_tag("ja").as_deref(), Some("ja"));
    assert_eq!(posix_to_tag("C.UTF-8"), None);
    assert_eq!(posix_to_tag("POSIX"), None);
  }
}
