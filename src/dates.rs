//! Calendar helpers for plan weeks
//!
//! Plan dates come from model output, CSV cells and stored JSON, so parsing
//! never fails loudly: anything unreadable is simply `None`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Days covered by a plan week, start day included
pub const DAYS_PER_WEEK: i64 = 7;

/// Parse a date leniently: `YYYY-MM-DD`, RFC 3339, or a naive ISO date-time
pub fn to_date_safe(text: &str) -> Option<NaiveDate> {
  let text = text.trim();
  if text.is_empty() {
    return None;
  }

  if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
    return Some(date);
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
    return Some(dt.date_naive());
  }

  ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    .map(|dt| dt.date())
}

pub fn format_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

/// First and last day of the week starting at `start` (inclusive)
pub fn week_span(start: NaiveDate) -> (NaiveDate, NaiveDate) {
  (start, start + Duration::days(DAYS_PER_WEEK - 1))
}

/// The seven calendar days of a week, or none when the start is unknown
pub fn days_in_week(start: Option<NaiveDate>) -> Vec<NaiveDate> {
  match start {
    Some(start) => (0..DAYS_PER_WEEK).map(|i| start + Duration::days(i)).collect(),
    None => Vec::new(),
  }
}
