use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::dates::to_date_safe;

/// Raw questionnaire answers as submitted by the plan wizard.
///
/// Every field is free text. Nothing here is validated; consumers parse
/// what they need opportunistically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionnaireAnswers {
  pub race_distance: String,
  pub race_date: String,
  pub target_time: String,
  pub recent_race_distance: String,
  pub recent_race_time: String,
  pub current_mileage: String,
  pub long_run: String,
  pub easy_pace: String,
  pub experience: String,
  pub days_per_week: String,
  pub constraints: String,
}

impl QuestionnaireAnswers {
  /// Whether enough of the wizard was filled in to request a plan
  pub fn is_complete(&self) -> bool {
    [
      &self.race_distance,
      &self.race_date,
      &self.current_mileage,
      &self.long_run,
      &self.experience,
      &self.days_per_week,
    ]
    .iter()
    .all(|field| !field.trim().is_empty())
  }

  /// Recent race as "<distance> in <time>", or None when the runner has none
  pub fn recent_race(&self) -> Option<String> {
    let distance = self.recent_race_distance.trim();
    if distance.is_empty() || distance == "None" {
      return None;
    }
    Some(format!("{} in {}", distance, self.recent_race_time.trim()))
  }
}

/// One week of a generated or imported plan.
///
/// Field names on the wire follow the shape the prompt asks the model for,
/// so the JSON a provider returns deserializes directly. Deserialization is
/// lenient: malformed numbers become 0 and an unreadable start date becomes
/// `None` rather than rejecting the whole plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekPlanEntry {
  #[serde(rename = "weekNumber", default, deserialize_with = "lenient_week_number")]
  pub week_number: u32,

  #[serde(rename = "Phase", default, deserialize_with = "lenient_text")]
  pub phase: String,

  #[serde(rename = "startDate", default, deserialize_with = "lenient_date")]
  pub start_date: Option<NaiveDate>,

  #[serde(rename = "longRunKm", default, deserialize_with = "lenient_number")]
  pub long_run_km: f64,

  #[serde(rename = "weeklyMileage", default, deserialize_with = "lenient_number")]
  pub weekly_mileage: f64,

  #[serde(rename = "Key Workout", default, deserialize_with = "lenient_text")]
  pub key_workout: String,

  #[serde(rename = "Long Run Pace", default, deserialize_with = "lenient_text")]
  pub long_run_pace: String,
}

impl WeekPlanEntry {
  /// Map one element of a recovered plan array. Anything that is not a
  /// week object becomes an empty week instead of failing the plan.
  pub fn from_value(value: Value) -> Self {
    serde_json::from_value(value).unwrap_or_default()
  }
}

/// Fill in missing week numbers with the 1-based position in the plan.
///
/// Facts are keyed by week number, so numbers must be unique. When the
/// filled-in and explicit numbers collide, the whole plan is renumbered by
/// position.
pub fn number_weeks(plan: &mut [WeekPlanEntry]) {
  for (idx, week) in plan.iter_mut().enumerate() {
    if week.week_number == 0 {
      week.week_number = idx as u32 + 1;
    }
  }

  let mut seen = HashSet::with_capacity(plan.len());
  if !plan.iter().all(|week| seen.insert(week.week_number)) {
    for (idx, week) in plan.iter_mut().enumerate() {
      week.week_number = idx as u32 + 1;
    }
  }
}

/// Numeric coercion used for every user- or model-supplied figure.
/// Blank, non-numeric or non-finite text is 0.
pub fn parse_number(text: &str) -> f64 {
  text
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|v| v.is_finite())
    .unwrap_or(0.0)
}

fn coerce_number(value: &Value) -> f64 {
  match value {
    Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
    Value::String(s) => parse_number(s),
    _ => 0.0,
  }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  Ok(coerce_number(&value).max(0.0))
}

fn lenient_week_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  let n = coerce_number(&value);
  if n < 1.0 || n > u32::MAX as f64 {
    return Ok(0);
  }
  Ok(n.trunc() as u32)
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  Ok(value.as_str().and_then(to_date_safe))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  Ok(match value {
    Value::Null => String::new(),
    Value::String(s) => s,
    other => other.to_string(),
  })
}
