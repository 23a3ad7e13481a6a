//! Structured cache keys.

use chrono::{DateTime, FixedOffset};
use std::fmt;

const SEPARATOR: char = ':';
const KEY_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Identifies one memoized call: the accessor namespace plus its arguments.
///
/// Keys render to strings of the form `namespace[:start:end][:detail][:scope]`.
/// Every component is escaped, so two different keys never render to the same
/// string, while readable prefixes such as `get_pos_orders:2025-07` still match
/// every July 2025 window of that accessor. Bounds are local wall-clock times
/// followed by their UTC offset, so the two passes through a DST overlap differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  namespace: String,
  range: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,
  detail: Option<bool>,
  scope: Option<String>,
}

impl CacheKey {
  pub fn new(namespace: impl Into<String>) -> Self {
    Self {
      namespace: namespace.into(),
      range: None,
      detail: None,
      scope: None,
    }
  }

  /// Scope the key to a window given as local times with their offsets.
  pub fn with_range(mut self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
    self.range = Some((start, end));
    self
  }

  pub fn with_detail(mut self, include_detail: bool) -> Self {
    self.detail = Some(include_detail);
    self
  }

  /// Extra arguments that change the result, rendered last.
  pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
    self.scope = Some(scope.into());
    self
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  /// Render the key to the string stored in the cache.
  pub fn render(&self) -> String {
    let mut out = escape(&self.namespace);
    if let Some((start, end)) = &self.range {
      out.push(SEPARATOR);
      out.push_str(&escape(&start.format(KEY_DATETIME_FORMAT).to_string()));
      out.push(SEPARATOR);
      out.push_str(&escape(&end.format(KEY_DATETIME_FORMAT).to_string()));
    }
    if let Some(detail) = self.detail {
      out.push(SEPARATOR);
      out.push_str(if detail { "true" } else { "false" });
    }
    if let Some(scope) = &self.scope {
      out.push(SEPARATOR);
      out.push_str(&escape(scope));
    }
    out
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.render())
  }
}

/// Percent-escape the separator and the escape character itself.
fn escape(component: &str) -> String {
  let mut out = String::with_capacity(component.len());
  for c in component.chars() {
    match c {
      '%' => out.push_str("%25"),
      SEPARATOR => out.push_str("%3A"),
      _ => out.push(c),
    }
  }
  out
}
