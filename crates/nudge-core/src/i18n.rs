//! Localization message bundles.
//!
//! Bundles are `.properties`-style `key=value` files. Lookups never fail: an
//! unknown key comes back as itself, which keeps untranslated strings visible
//! instead of blank.

use std::collections::{BTreeMap, HashMap};

use crate::locale::match_locale;

#[derive(Debug, Clone, Default)]
pub struct MessageBundle {
  messages: HashMap<String, String>,
}

impl MessageBundle {
  /// Parse `key=value` lines. Blank lines and lines starting with `#` or `!`
  /// are skipped, as are lines without `=`.
  pub fn from_properties(text: &str) -> Self {
    let messages = text
      .lines()
      .map(str::trim_start)
      .filter(|line| !line.is_empty() && !line.starts_with(['#', '!']))
      .filter_map(|line| line.split_once('='))
      .map(|(k, v)| (k.trim().to_owned(), v.trim_start().to_owned()))
      .collect();
    Self { messages }
  }

  /// The message for `key` with `$1`, `$2`, ... replaced from `args`.
  ///
  /// Placeholders without a matching argument are kept verbatim.
  pub fn get_message(&self, key: &str, args: &[&str]) -> String {
    match self.messages.get(key) {
      Some(text) => substitute(text, args),
      None => key.to_owned(),
    }
  }

  pub fn len(&self) -> usize { self.messages.len() }

  pub fn is_empty(&self) -> bool { self.messages.is_empty() }
}

fn substitute(text: &str, args: &[&str]) -> String {
  if args.is_empty() {
    return text.to_owned();
  }
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(pos) = rest.find('$') {
    out.push_str(&rest[..pos]);
    let after = &rest[pos + 1..];
    let digits = after.len() - after.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let arg = after[..digits]
      .parse::<usize>()
      .ok()
      .and_then(|n| n.checked_sub(1))
      .and_then(|i| args.get(i));
    match arg {
      Some(arg) => out.push_str(arg),
      None => out.push_str(&rest[pos..pos + 1 + digits]),
    }
    rest = &after[digits..];
  }
  out.push_str(rest);
  out
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Bundles for several locales, looked up with the same exact-then-primary
/// rule as campaign text.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
  bundles:  BTreeMap<String, MessageBundle>,
  fallback: MessageBundle,
}

impl MessageCatalog {
  pub fn new(fallback: MessageBundle) -> Self {
    Self {
      bundles: BTreeMap::new(),
      fallback,
    }
  }

  pub fn insert(&mut self, tag: impl Into<String>, bundle: MessageBundle) {
    self.bundles.insert(tag.into(), bundle);
  }

  /// The bundle for `tag`, or the fallback bundle.
  pub fn bundle_for(&self, tag: Option<&str>) -> &MessageBundle {
    tag
      .and_then(|t| match_locale(&self.bundles, t))
      .unwrap_or(&self.fallback)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const EN: &str = "
# popup strings
popup_title=Nudge
  greeting = Hello, $1! You have $2 messages.
! legacy comment
broken line
empty=
";

  #[test]
  fn parses_properties() {
    let b = MessageBundle::from_properties(EN);
    assert_eq!(b.len(), 3);
    assert_eq!(b.get_message("popup_title", &[]), "Nudge");
    assert_eq!(b.get_message("empty", &["x"]), "");
  }

  #[test]
  fn substitutes_numbered_placeholders() {
    let b = MessageBundle::from_properties(EN);
    assert_eq!(
      b.get_message("greeting", &["Ann", "3"]),
      "Hello, Ann! You have 3 messages."
    );
    assert_eq!(
      b.get_message("greeting", &["Ann"]),
      "Hello, Ann! You have $2 messages."
    );
  }

  #[test]
  fn odd_placeholders_are_left_alone() {
    assert_eq!(substitute("cost $ $0 $1$1 $", &["5"]), "cost $ $0 55 $");
    assert_eq!(substitute("$10", &["a"]), "$10");
  }

  #[test]
  fn unknown_key_returns_key() {
    let b = MessageBundle::default();
    assert_eq!(b.get_message("missing_key", &["x"]), "missing_key");
  }

  #[test]
  fn catalog_uses_locale_fallbacks() {
    let mut catalog = MessageCatalog::new(MessageBundle::from_properties("hi=Hi"));
    catalog.insert("de", MessageBundle::from_properties("hi=Hallo"));

    assert_eq!(catalog.bundle_for(Some("de-AT")).get_message("hi", &[]), "Hallo");
    assert_eq!(catalog.bundle_for(Some("fr")).get_message("hi", &[]), "Hi");
    assert_eq!(catalog.bundle_for(None).get_message("hi", &[]), "Hi");
  }
}
