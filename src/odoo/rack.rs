//! Cleanup of the free-text `rack_location` product field.
//!
//! Besides the facility code, staff write a "déréférencé" marker (in any
//! spelling, case or accent) or "pas de rotation" into the field to flag a
//! product taken out of rotation. We split that into a clean code and a flag.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Matched against the case- and accent-folded text.
static RE_DELISTED: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\bderef[a-z]*|\bpas\s+de\s+rotation\b").expect("Failed to create delisted marker regex")
});

/// Punctuation left dangling once a marker is removed.
const SEPARATORS: &[char] = &['-', '–', '—', '_', '/', '|', ',', ';', ':', '.', '(', ')', '[', ']', '*', '#', '+'];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackCode {
  /// Facility code with markers stripped, `None` when nothing is left
  pub code: Option<String>,
  /// Whether the product is flagged as out of rotation
  pub delisted: bool,
}

impl RackCode {
  pub fn parse(raw: &str) -> Self {
    let (folded, origin) = fold(raw);

    let mut removed = vec![false; raw.chars().count()];
    let mut delisted = false;
    for found in RE_DELISTED.find_iter(&folded) {
      delisted = true;
      if found.is_empty() {
        continue;
      }
      let first = origin[found.start()];
      let last = origin[found.end() - 1];
      removed[first..=last].iter_mut().for_each(|r| *r = true);
    }

    let kept: String = raw
      .chars()
      .zip(removed)
      .filter_map(|(c, removed)| (!removed).then_some(c))
      .collect();

    let code = kept
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ")
      .trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
      .to_string();

    Self {
      code: (!code.is_empty()).then_some(code),
      delisted,
    }
  }

  /// Normalize the raw ORM value, where `false`/missing means no rack at all.
  pub fn from_field(raw: Option<&str>) -> Self {
    raw.map(Self::parse).unwrap_or_default()
  }

  /// Run the cleanup again on an already-clean value, keeping the flag.
  pub fn renormalize(&self) -> Self {
    let again = Self::from_field(self.code.as_deref());
    Self {
      code: again.code,
      delisted: self.delisted || again.delisted,
    }
  }
}

/// Lowercase and strip diacritics.
///
/// Returns the folded text and, for each of its bytes, the index of the
/// original character it came from.
fn fold(raw: &str) -> (String, Vec<usize>) {
  let mut folded = String::with_capacity(raw.len());
  let mut origin = Vec::with_capacity(raw.len());

  for (index, c) in raw.chars().enumerate() {
    for base in std::iter::once(c).nfd().filter(|c| !is_combining_mark(*c)) {
      for lower in base.to_lowercase() {
        folded.push(lower);
        origin.extend(std::iter::repeat(index).take(lower.len_utf8()));
      }
    }
  }

  (folded, origin)
}
