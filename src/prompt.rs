//! Plan prompt rendering
//!
//! Turns questionnaire answers into the single instruction sent to every
//! provider. Pure and deterministic: the same answers and date always render
//! the same text.

use chrono::NaiveDate;

use crate::dates::format_date;
use crate::models::QuestionnaireAnswers;

/// System role text for providers that take a separate system message
pub const COACH_SYSTEM_PROMPT: &str = "You are a running coach and training plan generator.";

/// Week fields the model must emit, in order. These are the wire names
/// `WeekPlanEntry` deserializes.
pub const WEEK_FIELDS: [&str; 7] = [
  "weekNumber",
  "Phase",
  "startDate",
  "longRunKm",
  "weeklyMileage",
  "Key Workout",
  "Long Run Pace",
];

fn or_none(value: &str) -> &str {
  if value.trim().is_empty() {
    "None"
  } else {
    value
  }
}

/// Render the plan-generation instruction for `answers`, starting on `current_date`
pub fn build_plan_prompt(answers: &QuestionnaireAnswers, current_date: NaiveDate) -> String {
  let recent_race = answers
    .recent_race()
    .unwrap_or_else(|| "None".to_string());

  format!(
    r#"Generate a personalized running training plan as a JSON array of weeks. Each week should have: {fields} (as an exact pace range, e.g. 5:10-5:30/km, not a description).

User info:
- Goal distance: {distance}
- Race date: {race_date}
- Target finish time: {target_time}
- Recent race result: {recent_race}
- Current weekly mileage: {mileage} km
- Long run: {long_run} km
- Current easy pace: {easy_pace}
- Experience: {experience}
- Days per week: {days}
- Constraints: {constraints}
- Current date: {today}

The plan must start from the current date, and the first week may be partial if the race is not a whole number of weeks away. Each week must include exact pace ranges for all workouts and long runs. Use the user's current easy pace as a reference for recommended paces. The plan should gradually increase mileage, include a variety of workouts, and have a taper and race week. Output only a JSON array, no extra text."#,
    fields = WEEK_FIELDS.join(", "),
    distance = answers.race_distance,
    race_date = answers.race_date,
    target_time = answers.target_time,
    recent_race = recent_race,
    mileage = answers.current_mileage,
    long_run = answers.long_run,
    easy_pace = answers.easy_pace,
    experience = answers.experience,
    days = answers.days_per_week,
    constraints = or_none(&answers.constraints),
    today = format_date(current_date),
  )
}
