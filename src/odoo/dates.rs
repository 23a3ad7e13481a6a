//! Date windows: whole-calendar-day widening in the local zone, then UTC for the server.

use chrono::{
  DateTime, Datelike, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
  SubsecRound, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::str::FromStr;

use super::domain::{Domain, Operator};
use crate::error::{Error, Result};

/// Datetime format used by the Odoo ORM (always UTC on the wire).
pub const ODOO_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const ODOO_DATE_FORMAT: &str = "%Y-%m-%d";

/// One end of a requested window, as given by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateBound {
  /// A calendar day with no time: widened to the whole day.
  Day(NaiveDate),
  /// A wall-clock time in the configured local zone.
  Local(NaiveDateTime),
  /// An instant that already carries its offset: passed through.
  Zoned(DateTime<FixedOffset>),
}

impl FromStr for DateBound {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    // The server compares whole seconds
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
      return Ok(DateBound::Zoned(dt.trunc_subsecs(0)));
    }
    for format in [ODOO_DATETIME_FORMAT, "%Y-%m-%dT%H:%M:%S"] {
      if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
        return Ok(DateBound::Local(dt));
      }
    }
    NaiveDate::parse_from_str(s, ODOO_DATE_FORMAT)
      .map(DateBound::Day)
      .map_err(|_| Error::InvalidDate(s.to_string()))
  }
}

impl From<NaiveDate> for DateBound {
  fn from(date: NaiveDate) -> Self {
    DateBound::Day(date)
  }
}

impl From<NaiveDateTime> for DateBound {
  fn from(dt: NaiveDateTime) -> Self {
    DateBound::Local(dt)
  }
}

/// Which side of the window a bound sits on; only matters for `Day` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
  Start,
  End,
}

/// A normalized, inclusive window.
///
/// `local_*` are wall-clock times in the configured zone and are what cache
/// keys are built from; `utc_*` are what the server is queried with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
  pub local_start: NaiveDateTime,
  pub local_end: NaiveDateTime,
  pub utc_start: DateTime<Utc>,
  pub utc_end: DateTime<Utc>,
}

impl DateWindow {
  /// Normalize a window. A missing end means "same as start".
  pub fn normalize(start: DateBound, end: Option<DateBound>, tz: Tz) -> Result<Self> {
    let end = end.unwrap_or_else(|| start.clone());
    let (local_start, utc_start) = resolve(&start, Side::Start, tz)?;
    let (local_end, utc_end) = resolve(&end, Side::End, tz)?;

    Ok(Self {
      local_start,
      local_end,
      utc_start,
      utc_end,
    })
  }

  /// Parse and normalize bounds such as `2025-07-01` or `2025-07-01 18:00:00`.
  pub fn parse(start: &str, end: Option<&str>, tz: Tz) -> Result<Self> {
    let start: DateBound = start.parse()?;
    let end = end.map(str::parse::<DateBound>).transpose()?;
    Self::normalize(start, end, tz)
  }

  /// Whole days from `first` through `last`.
  pub fn days(first: NaiveDate, last: NaiveDate, tz: Tz) -> Result<Self> {
    Self::normalize(DateBound::Day(first), Some(DateBound::Day(last)), tz)
  }

  /// Split into windows of at most one calendar month each.
  ///
  /// Used to keep bulk exports from requesting everything in a single call.
  /// Only the inner month boundaries are widened to whole days; the first and
  /// last chunks keep the requested bounds.
  pub fn split_months(&self, tz: Tz) -> Result<Vec<DateWindow>> {
    let mut months = month_spans(self.local_start.date(), self.local_end.date())
      .into_iter()
      .map(|(first, last)| Self::days(first, last, tz))
      .collect::<Result<Vec<_>>>()?;

    if let Some(first) = months.first_mut() {
      first.local_start = self.local_start;
      first.utc_start = self.utc_start;
    }
    if let Some(last) = months.last_mut() {
      last.local_end = self.local_end;
      last.utc_end = self.utc_end;
    }
    Ok(months)
  }

  /// Bounds as local times carrying their UTC offset, for cache keys.
  ///
  /// The offset tells apart wall-clock times that occur twice when clocks go back.
  pub fn key_bounds(&self) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    Ok((
      with_offset(self.local_start, self.utc_start)?,
      with_offset(self.local_end, self.utc_end)?,
    ))
  }

  /// Filter on a datetime field: compared in UTC, inclusive on both ends.
  pub fn datetime_domain(&self, field: &str) -> Domain {
    Domain::and([
      Domain::term(field, Operator::Ge, to_odoo_datetime(self.utc_start)),
      Domain::term(field, Operator::Le, to_odoo_datetime(self.utc_end)),
    ])
  }

  /// Filter on a date-only field: compared on local calendar days.
  pub fn date_domain(&self, field: &str) -> Domain {
    Domain::and([
      Domain::term(
        field,
        Operator::Ge,
        self.local_start.date().format(ODOO_DATE_FORMAT).to_string(),
      ),
      Domain::term(
        field,
        Operator::Le,
        self.local_end.date().format(ODOO_DATE_FORMAT).to_string(),
      ),
    ])
  }
}

fn resolve(bound: &DateBound, side: Side, tz: Tz) -> Result<(NaiveDateTime, DateTime<Utc>)> {
  match bound {
    DateBound::Zoned(dt) => {
      let utc = dt.with_timezone(&Utc);
      Ok((utc.with_timezone(&tz).naive_local(), utc))
    }
    DateBound::Local(local) => Ok((*local, localize(*local, tz)?)),
    DateBound::Day(day) => {
      let time = match side {
        Side::Start => NaiveTime::MIN,
        Side::End => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
      };
      let local = day.and_time(time);
      Ok((local, localize(local, tz)?))
    }
  }
}

fn with_offset(local: NaiveDateTime, utc: DateTime<Utc>) -> Result<DateTime<FixedOffset>> {
  let seconds = (local - utc.naive_utc()).num_seconds();
  i32::try_from(seconds)
    .ok()
    .and_then(FixedOffset::east_opt)
    .and_then(|offset| offset.from_local_datetime(&local).single())
    .ok_or_else(|| Error::InvalidDate(format!("{} at {}", local, utc)))
}

/// Interpret a wall-clock time in `tz`.
///
/// Ambiguous times (clocks going back) resolve to the earliest instant; times
/// that do not exist (clocks going forward) move one hour later.
pub fn localize(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
  let resolved = match tz.from_local_datetime(&local) {
    LocalResult::Single(dt) => Some(dt),
    LocalResult::Ambiguous(earliest, _) => Some(earliest),
    LocalResult::None => tz.from_local_datetime(&(local + Duration::hours(1))).earliest(),
  };

  resolved
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or_else(|| Error::InvalidDate(format!("{} in {}", local, tz.name())))
}

pub fn to_odoo_datetime(dt: DateTime<Utc>) -> String {
  dt.format(ODOO_DATETIME_FORMAT).to_string()
}

/// Calendar-month chunks covering `first..=last`, clipped at both ends.
pub fn month_spans(first: NaiveDate, last: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
  let mut spans = Vec::new();
  let mut cursor = first;

  while cursor <= last {
    let next_month = if cursor.month() == 12 {
      NaiveDate::from_ymd_opt(cursor.year() + 1, 1, 1)
    } else {
      NaiveDate::from_ymd_opt(cursor.year(), cursor.month() + 1, 1)
    };
    let Some(next_month) = next_month else {
      spans.push((cursor, last));
      break;
    };

    let month_end = next_month - Duration::days(1);
    spans.push((cursor, month_end.min(last)));
    cursor = next_month;
  }

  spans
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono_tz::Europe::Paris;

  fn fmt(dt: NaiveDateTime) -> String {
    dt.format(ODOO_DATETIME_FORMAT).to_string()
  }

  #[test]
  fn test_day_is_widened_to_whole_day() {
    let window = DateWindow::parse("2025-07-14", None, Paris).unwrap();

    assert_eq!(fmt(window.local_start), "2025-07-14 00:00:00");
    assert_eq!(fmt(window.local_end), "2025-07-14 23:59:59");
    // Paris is UTC+2 in July
    assert_eq!(to_odoo_datetime(window.utc_start), "2025-07-13 22:00:00");
    assert_eq!(to_odoo_datetime(window.utc_end), "2025-07-14 21:59:59");
  }

  #[test]
  fn test_range_of_days() {
    let window = DateWindow::parse("2025-01-01", Some("2025-01-31"), Paris).unwrap();
    assert_eq!(fmt(window.local_start), "2025-01-01 00:00:00");
    assert_eq!(fmt(window.local_end), "2025-01-31 23:59:59");
    assert_eq!(to_odoo_datetime(window.utc_start), "2024-12-31 23:00:00");
  }

  #[test]
  fn test_time_of_day_is_kept() {
    let window = DateWindow::parse("2023-11-04 16:00:00", Some("2023-11-04 22:00:00"), Paris).unwrap();
    assert_eq!(fmt(window.local_start), "2023-11-04 16:00:00");
    assert_eq!(fmt(window.local_end), "2023-11-04 22:00:00");
    assert_eq!(to_odoo_datetime(window.utc_start), "2023-11-04 15:00:00");
  }

  #[test]
  fn test_zoned_bounds_pass_through() {
    let window = DateWindow::parse(
      "2025-03-01T10:00:00Z",
      Some("2025-03-02T10:00:00+00:00"),
      Paris,
    )
    .unwrap();
    assert_eq!(to_odoo_datetime(window.utc_start), "2025-03-01 10:00:00");
    assert_eq!(to_odoo_datetime(window.utc_end), "2025-03-02 10:00:00");
    assert_eq!(fmt(window.local_start), "2025-03-01 11:00:00");
  }

  #[test]
  fn test_utc_zone_is_identity() {
    let window = DateWindow::parse("2025-02-10", None, Tz::UTC).unwrap();
    assert_eq!(to_odoo_datetime(window.utc_start), "2025-02-10 00:00:00");
    assert_eq!(to_odoo_datetime(window.utc_end), "2025-02-10 23:59:59");
  }

  #[test]
  fn test_invalid_date() {
    assert!(matches!(
      DateWindow::parse("14/07/2025", None, Paris),
      Err(Error::InvalidDate(_))
    ));
  }

  #[test]
  fn test_dst_gap_moves_forward() {
    // 2025-03-30 02:30 does not exist in Paris
    let local = NaiveDate::from_ymd_opt(2025, 3, 30)
      .and_then(|d| d.and_hms_opt(2, 30, 0))
      .unwrap();
    let utc = localize(local, Paris).unwrap();
    assert_eq!(to_odoo_datetime(utc), "2025-03-30 01:30:00");
  }

  #[test]
  fn test_dst_overlap_takes_earliest() {
    // 2025-10-26 02:30 happens twice in Paris
    let local = NaiveDate::from_ymd_opt(2025, 10, 26)
      .and_then(|d| d.and_hms_opt(2, 30, 0))
      .unwrap();
    let utc = localize(local, Paris).unwrap();
    assert_eq!(to_odoo_datetime(utc), "2025-10-26 00:30:00");
  }

  #[test]
  fn test_datetime_domain() {
    let window = DateWindow::parse("2025-07-14", None, Tz::UTC).unwrap();
    assert_eq!(
      window.datetime_domain("date_order").to_value(),
      serde_json::json!([
        "&",
        ["date_order", ">=", "2025-07-14 00:00:00"],
        ["date_order", "<=", "2025-07-14 23:59:59"]
      ])
    );
  }

  #[test]
  fn test_date_domain_uses_local_days() {
    let window = DateWindow::parse("2025-07-01", Some("2025-07-31"), Paris).unwrap();
    assert_eq!(
      window.date_domain("date_invoice").to_value(),
      serde_json::json!([
        "&",
        ["date_invoice", ">=", "2025-07-01"],
        ["date_invoice", "<=", "2025-07-31"]
      ])
    );
  }

  #[test]
  fn test_month_spans_clip_both_ends() {
    let first = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
    let last = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
    let spans = month_spans(first, last);

    let rendered: Vec<(String, String)> = spans
      .iter()
      .map(|(a, b)| (a.to_string(), b.to_string()))
      .collect();
    assert_eq!(
      rendered,
      vec![
        ("2024-11-15".to_string(), "2024-11-30".to_string()),
        ("2024-12-01".to_string(), "2024-12-31".to_string()),
        ("2025-01-01".to_string(), "2025-01-31".to_string()),
        ("2025-02-01".to_string(), "2025-02-10".to_string()),
      ]
    );
  }

  #[test]
  fn test_split_months() {
    let window = DateWindow::parse("2025-01-20", Some("2025-02-05"), Paris).unwrap();
    let months = window.split_months(Paris).unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(fmt(months[0].local_end), "2025-01-31 23:59:59");
    assert_eq!(fmt(months[1].local_start), "2025-02-01 00:00:00");
  }

  #[test]
  fn test_split_months_keeps_requested_times() {
    let window = DateWindow::parse("2025-07-01 18:00:00", Some("2025-07-02 06:00:00"), Paris).unwrap();
    let months = window.split_months(Paris).unwrap();
    assert_eq!(months, vec![window.clone()]);

    let window = DateWindow::parse("2025-06-30 18:00:00", Some("2025-07-02 06:00:00"), Paris).unwrap();
    let months = window.split_months(Paris).unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(fmt(months[0].local_start), "2025-06-30 18:00:00");
    assert_eq!(to_odoo_datetime(months[0].utc_start), "2025-06-30 16:00:00");
    assert_eq!(fmt(months[0].local_end), "2025-06-30 23:59:59");
    assert_eq!(fmt(months[1].local_start), "2025-07-01 00:00:00");
    assert_eq!(fmt(months[1].local_end), "2025-07-02 06:00:00");
    assert_eq!(to_odoo_datetime(months[1].utc_end), "2025-07-02 04:00:00");
  }

  #[test]
  fn test_key_bounds_tell_dst_overlap_apart() {
    let summer = DateWindow::parse("2025-10-26T00:30:00Z", Some("2025-10-26T00:45:00Z"), Paris).unwrap();
    let winter = DateWindow::parse("2025-10-26T01:30:00Z", Some("2025-10-26T01:45:00Z"), Paris).unwrap();
    // Same wall clock in Paris
    assert_eq!(summer.local_start, winter.local_start);

    let (summer_start, _) = summer.key_bounds().unwrap();
    let (winter_start, _) = winter.key_bounds().unwrap();
    assert_eq!(summer_start.to_rfc3339(), "2025-10-26T02:30:00+02:00");
    assert_eq!(winter_start.to_rfc3339(), "2025-10-26T02:30:00+01:00");
  }

  #[test]
  fn test_key_bounds_in_dst_gap_match_the_query() {
    let window = DateWindow::parse("2025-03-30 02:30:00", None, Paris).unwrap();
    let (start, _) = window.key_bounds().unwrap();
    assert_eq!(start.with_timezone(&Utc), window.utc_start);
  }

  #[test]
  fn test_sub_second_input_is_truncated() {
    let exact = DateWindow::parse("2025-07-14T10:00:00Z", None, Paris).unwrap();
    let fraction = DateWindow::parse("2025-07-14T10:00:00.750Z", None, Paris).unwrap();
    assert_eq!(exact, fraction);
  }
}
