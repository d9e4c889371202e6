//! CSV plan import
//!
//! Alternate plan source: a spreadsheet export with one row per week.
//! Headers are checked up front; a file missing any required column is
//! rejected whole. Bad numbers inside a row become 0 instead of failing it.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::debug;

use crate::dates::to_date_safe;
use crate::models::plan::{number_weeks, parse_number};
use crate::models::WeekPlanEntry;

pub const COL_WEEK: &str = "Week";
pub const COL_PHASE: &str = "Phase";
pub const COL_START: &str = "Start";
pub const COL_LONG_RUN: &str = "Long Run (km)";
pub const COL_KEY_WORKOUT: &str = "Key Workout";
pub const COL_WEEKLY_MILEAGE: &str = "Weekly Mileage (km)";
pub const COL_LONG_RUN_PACE: &str = "Long Run Pace";

pub const REQUIRED_COLUMNS: [&str; 7] = [
  COL_WEEK,
  COL_PHASE,
  COL_START,
  COL_LONG_RUN,
  COL_KEY_WORKOUT,
  COL_WEEKLY_MILEAGE,
  COL_LONG_RUN_PACE,
];

#[derive(Debug, Error)]
pub enum ImportError {
  #[error("Missing required columns: {}", .0.join(", "))]
  MissingColumns(Vec<String>),

  #[error("Error parsing CSV file: {0}")]
  Csv(#[from] csv::Error),

  #[error("CSV file contains no plan rows")]
  Empty,
}

/// Column positions resolved from the header row
struct ColumnMap {
  week: usize,
  phase: usize,
  start: usize,
  long_run: usize,
  key_workout: usize,
  weekly_mileage: usize,
  long_run_pace: usize,
}

impl ColumnMap {
  fn resolve(headers: &StringRecord) -> Result<Self, ImportError> {
    let position = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
      .iter()
      .filter(|col| position(col).is_none())
      .map(|col| col.to_string())
      .collect();
    if !missing.is_empty() {
      return Err(ImportError::MissingColumns(missing));
    }

    let at = |name: &str| position(name).unwrap_or_default();
    Ok(Self {
      week: at(COL_WEEK),
      phase: at(COL_PHASE),
      start: at(COL_START),
      long_run: at(COL_LONG_RUN),
      key_workout: at(COL_KEY_WORKOUT),
      weekly_mileage: at(COL_WEEKLY_MILEAGE),
      long_run_pace: at(COL_LONG_RUN_PACE),
    })
  }

  fn to_week(&self, record: &StringRecord) -> WeekPlanEntry {
    let cell = |idx: usize| record.get(idx).unwrap_or("");
    let week_number = parse_number(cell(self.week)).trunc();

    WeekPlanEntry {
      week_number: if week_number >= 1.0 { week_number as u32 } else { 0 },
      phase: cell(self.phase).to_string(),
      start_date: to_date_safe(cell(self.start)),
      long_run_km: parse_number(cell(self.long_run)).max(0.0),
      weekly_mileage: parse_number(cell(self.weekly_mileage)).max(0.0),
      key_workout: cell(self.key_workout).to_string(),
      long_run_pace: cell(self.long_run_pace).to_string(),
    }
  }
}

/// Read a plan from CSV. Rows without a usable week number are numbered by
/// position.
pub fn import_plan<R: Read>(reader: R) -> Result<Vec<WeekPlanEntry>, ImportError> {
  let mut reader = ReaderBuilder::new()
    .has_headers(true)
    .trim(Trim::All)
    .from_reader(reader);

  let columns = ColumnMap::resolve(reader.headers()?)?;

  let mut plan = Vec::new();
  for record in reader.records() {
    let record = record?;
    if record.iter().all(|field| field.is_empty()) {
      continue;
    }
    plan.push(columns.to_week(&record));
  }

  if plan.is_empty() {
    return Err(ImportError::Empty);
  }

  number_weeks(&mut plan);
  debug!(weeks = plan.len(), "import_plan: parsed CSV plan");
  Ok(plan)
}

pub fn import_plan_str(text: &str) -> Result<Vec<WeekPlanEntry>, ImportError> {
  import_plan(text.as_bytes())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  const HEADER: &str =
    "Week,Phase,Start,Long Run (km),Key Workout,Weekly Mileage (km),Long Run Pace";

  #[test]
  fn test_import_maps_columns() {
    let csv = format!(
      "{}\n1,Base,2024-06-03,12,\"Tempo 3x2km, 4:50/km\",32,6:00-6:20/km\n2,Build,2024-06-10,14,Hills,36.5,5:55-6:15/km\n",
      HEADER
    );

    let plan = import_plan_str(&csv).unwrap();
    assert_eq!(plan.len(), 2);

    let first = &plan[0];
    assert_eq!(first.week_number, 1);
    assert_eq!(first.phase, "Base");
    assert_eq!(first.start_date, NaiveDate::from_ymd_opt(2024, 6, 3));
    assert_eq!(first.long_run_km, 12.0);
    assert_eq!(first.key_workout, "Tempo 3x2km, 4:50/km");
    assert_eq!(first.weekly_mileage, 32.0);
    assert_eq!(first.long_run_pace, "6:00-6:20/km");

    assert_eq!(plan[1].weekly_mileage, 36.5);
  }

  #[test]
  fn test_missing_column_is_listed() {
    let csv = "Week,Phase,Start,Long Run (km),Key Workout,Weekly Mileage (km)\n1,Base,2024-06-03,12,Tempo,32\n";

    match import_plan_str(csv) {
      Err(ImportError::MissingColumns(missing)) => {
        assert_eq!(missing, vec!["Long Run Pace".to_string()]);
      }
      other => panic!("expected missing columns, got {:?}", other),
    }
  }

  #[test]
  fn test_missing_columns_message() {
    let err = import_plan_str("Week,Phase\n1,Base\n").unwrap_err();
    assert_eq!(
      err.to_string(),
      "Missing required columns: Start, Long Run (km), Key Workout, Weekly Mileage (km), Long Run Pace"
    );
  }

  #[test]
  fn test_malformed_numbers_coerce_to_zero() {
    let csv = format!("{}\nx,Base,soon,far,Rest,lots,easy\n", HEADER);
    let plan = import_plan_str(&csv).unwrap();

    let week = &plan[0];
    assert_eq!(week.week_number, 1);
    assert!(week.start_date.is_none());
    assert_eq!(week.long_run_km, 0.0);
    assert_eq!(week.weekly_mileage, 0.0);
  }

  #[test]
  fn test_blank_lines_are_skipped() {
    let csv = format!("{}\n\n1,Base,2024-06-03,12,Tempo,32,6:00/km\n,,,,,,\n", HEADER);
    let plan = import_plan_str(&csv).unwrap();
    assert_eq!(plan.len(), 1);
  }

  #[test]
  fn test_header_only_is_empty() {
    let err = import_plan_str(&format!("{}\n", HEADER)).unwrap_err();
    assert!(matches!(err, ImportError::Empty));
  }

  #[test]
  fn test_ragged_row_is_rejected() {
    let csv = format!("{}\n1,Base,2024-06-03\n", HEADER);
    assert!(matches!(import_plan_str(&csv), Err(ImportError::Csv(_))));
  }
}
