//! Normalization of loosely typed ORM values.
//!
//! Odoo encodes a many-to-one relation as `[id, display_name]`, or `false`
//! when unset, and uses `false` as the "empty" value of every field type.
//! Everything here accepts its own output, so normalizing twice is harmless.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::dates::{ODOO_DATETIME_FORMAT, ODOO_DATE_FORMAT};

/// An untyped record as returned by `search_read`.
pub type Record = Map<String, Value>;

/// A decoded many-to-one value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Many2One {
  #[default]
  Absent,
  Ref { id: i64, label: Option<String> },
}

impl Many2One {
  /// Decode `false`/`null`, `[id, label]`, `[id]` or an already-unwrapped `id`.
  pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
    match value {
      Value::Null | Value::Bool(false) => Ok(Many2One::Absent),
      Value::Number(n) => n
        .as_i64()
        .map(|id| Many2One::Ref { id, label: None })
        .ok_or_else(|| de::Error::custom(format!("relation id is not an integer: {}", n))),
      Value::Array(items) => match items.as_slice() {
        [Value::Number(n), rest @ ..] if rest.len() <= 1 => {
          let id = n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("relation id is not an integer: {}", n)))?;
          let label = match rest.first() {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
          };
          Ok(Many2One::Ref { id, label })
        }
        _ => Err(de::Error::custom(format!(
          "expected [id, label] relation, got {}",
          value
        ))),
      },
      other => Err(de::Error::custom(format!(
        "expected [id, label], id or false, got {}",
        other
      ))),
    }
  }

  pub fn id(&self) -> Option<i64> {
    match self {
      Many2One::Absent => None,
      Many2One::Ref { id, .. } => Some(*id),
    }
  }

  pub fn label(&self) -> Option<&str> {
    match self {
      Many2One::Absent => None,
      Many2One::Ref { label, .. } => label.as_deref(),
    }
  }

  /// Split into separate id and label columns.
  pub fn into_parts(self) -> (Option<i64>, Option<String>) {
    match self {
      Many2One::Absent => (None, None),
      Many2One::Ref { id, label } => (Some(id), label),
    }
  }
}

impl<'de> Deserialize<'de> for Many2One {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Many2One::from_value(&value).map_err(de::Error::custom)
  }
}

// ============================================================================
// Field deserializers
// ============================================================================

/// `false`/`null` → `None`, anything else decoded as `T`.
pub fn false_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let value = Value::deserialize(deserializer)?;
  if is_false_sentinel(&value) {
    return Ok(None);
  }
  serde_json::from_value(value).map(Some).map_err(de::Error::custom)
}

/// Like [`false_as_none`], and also treats `0` as unset.
pub fn zero_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let value = Value::deserialize(deserializer)?;
  if is_false_sentinel(&value) || is_zero(&value) {
    return Ok(None);
  }
  serde_json::from_value(value).map(Some).map_err(de::Error::custom)
}

/// `false`/`null` → empty string, for text columns that are never null downstream.
pub fn false_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(false_as_none(deserializer)?.unwrap_or_default())
}

/// The id alone of a many-to-one relation.
pub fn relation_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
  Ok(Many2One::deserialize(deserializer)?.id())
}

/// An ORM datetime (`YYYY-MM-DD HH:MM:SS`, UTC) or an RFC 3339 string.
pub fn odoo_datetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
  let s = String::deserialize(deserializer)?;
  parse_odoo_datetime(&s).map_err(de::Error::custom)
}

pub fn odoo_datetime_opt<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
  let value = Value::deserialize(deserializer)?;
  match value {
    Value::String(s) => parse_odoo_datetime(&s).map(Some).map_err(de::Error::custom),
    v if is_false_sentinel(&v) => Ok(None),
    other => Err(de::Error::custom(format!("expected datetime string, got {}", other))),
  }
}

/// An ORM date (`YYYY-MM-DD`).
pub fn odoo_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
  let s = String::deserialize(deserializer)?;
  NaiveDate::parse_from_str(&s, ODOO_DATE_FORMAT).map_err(de::Error::custom)
}

pub fn odoo_date_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
  let value = Value::deserialize(deserializer)?;
  match value {
    Value::String(s) => NaiveDate::parse_from_str(&s, ODOO_DATE_FORMAT)
      .map(Some)
      .map_err(de::Error::custom),
    v if is_false_sentinel(&v) => Ok(None),
    other => Err(de::Error::custom(format!("expected date string, got {}", other))),
  }
}

fn parse_odoo_datetime(s: &str) -> Result<DateTime<Utc>, String> {
  if let Ok(dt) = NaiveDateTime::parse_from_str(s, ODOO_DATETIME_FORMAT) {
    return Ok(dt.and_utc());
  }
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| format!("invalid datetime '{}'", s))
}

fn is_false_sentinel(value: &Value) -> bool {
  matches!(value, Value::Null | Value::Bool(false))
}

fn is_zero(value: &Value) -> bool {
  value.as_f64() == Some(0.0)
}

// ============================================================================
// Untyped record helpers
// ============================================================================

/// Unwrap the relation in `field` in place.
///
/// The id stays in `field`. When `label_field` is given the display name is
/// moved there; an absent relation nulls both. A field already holding a bare
/// id is left alone and does not erase an existing label.
pub fn unwrap_relation(
  record: &mut Record,
  field: &str,
  label_field: Option<&str>,
) -> Result<(), serde_json::Error> {
  let Some(value) = record.get(field) else {
    return Ok(());
  };

  match Many2One::from_value(value)? {
    Many2One::Absent => {
      record.insert(field.to_string(), Value::Null);
      if let Some(label_field) = label_field {
        record.insert(label_field.to_string(), Value::Null);
      }
    }
    Many2One::Ref { id, label } => {
      record.insert(field.to_string(), Value::from(id));
      if let (Some(label_field), Some(label)) = (label_field, label) {
        record.insert(label_field.to_string(), Value::String(label));
      }
    }
  }
  Ok(())
}

/// Replace `false` and `0` in the listed optional fields with `null`.
pub fn null_sentinels(record: &mut Record, fields: &[&str]) {
  for field in fields {
    if let Some(value) = record.get_mut(*field) {
      if matches!(value, Value::Bool(false)) || is_zero(value) {
        *value = Value::Null;
      }
    }
  }
}

/// Move `from` to `to`, if present.
pub fn rename_field(record: &mut Record, from: &str, to: &str) {
  if let Some(value) = record.remove(from) {
    record.insert(to.to_string(), value);
  }
}
