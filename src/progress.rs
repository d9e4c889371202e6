//! Plan Adherence Tracking
//!
//! Completion state derived from an immutable plan plus user-entered facts.
//! Every week tracks exactly three events:
//! - key workout (manual flag)
//! - long run (manual flag)
//! - mileage target (derived: reported km >= planned km)
//!
//! Key principles:
//! - Nothing here mutates the plan or the facts
//! - Mileage completion is computed, never stored
//! - Malformed figures coerce to 0 instead of failing the plan

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{days_in_week, week_span};
use crate::models::plan::parse_number;
use crate::models::{CompletionFacts, EventKey, QuestionnaireAnswers, WeekPlanEntry};

/// Events tracked per week
pub const EVENTS_PER_WEEK: u32 = 3;

// ---------------------------------------------------------------------------
/// Week Status: where a week sits relative to today
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStatus {
    Past,
    Current,
    Future,
}

impl std::fmt::Display for WeekStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Past => write!(f, "past"),
            Self::Current => write!(f, "current"),
            Self::Future => write!(f, "future"),
        }
    }
}

/// Past when the week's last day is before today, future when its first day
/// is after today. A week without a start date counts as current.
pub fn week_status(week: &WeekPlanEntry, today: NaiveDate) -> WeekStatus {
    let Some(start) = week.start_date else {
        return WeekStatus::Current;
    };

    let (start, end) = week_span(start);
    if end < today {
        WeekStatus::Past
    } else if start > today {
        WeekStatus::Future
    } else {
        WeekStatus::Current
    }
}

// ---------------------------------------------------------------------------
// Per-week Progress
// ---------------------------------------------------------------------------

/// Reported km for the week meets the planned weekly mileage
pub fn mileage_completed(week: &WeekPlanEntry, facts: &CompletionFacts) -> bool {
    parse_number(facts.reported_mileage(week.week_number)) >= week.weekly_mileage
}

/// Number of the three tracked events done for this week (0..=3)
pub fn completed_events(week: &WeekPlanEntry, facts: &CompletionFacts) -> u32 {
    [
        facts.is_completed(&EventKey::key_workout(week.week_number)),
        facts.is_completed(&EventKey::long_run(week.week_number)),
        mileage_completed(week, facts),
    ]
    .into_iter()
    .filter(|done| *done)
    .count() as u32
}

/// Week completion as a percentage: one of 0, 33.3.., 66.6.. or 100
pub fn week_progress(week: &WeekPlanEntry, facts: &CompletionFacts) -> f64 {
    completed_events(week, facts) as f64 / EVENTS_PER_WEEK as f64 * 100.0
}

pub fn is_week_complete(week: &WeekPlanEntry, facts: &CompletionFacts) -> bool {
    completed_events(week, facts) == EVENTS_PER_WEEK
}

// ---------------------------------------------------------------------------
// Plan-wide Progress
// ---------------------------------------------------------------------------

/// Completed events across all weeks over `3 x weeks`. No plan (or an empty
/// one) is 0%.
pub fn overall_progress(plan: Option<&[WeekPlanEntry]>, facts: &CompletionFacts) -> f64 {
    let plan = match plan {
        Some(plan) if !plan.is_empty() => plan,
        _ => return 0.0,
    };

    let completed: u32 = plan.iter().map(|week| completed_events(week, facts)).sum();
    let total = plan.len() as f64 * EVENTS_PER_WEEK as f64;
    completed as f64 / total * 100.0
}

pub fn completed_weeks(plan: &[WeekPlanEntry], facts: &CompletionFacts) -> usize {
    plan.iter().filter(|week| is_week_complete(week, facts)).count()
}

/// Planned km summed over the plan
pub fn total_mileage(plan: &[WeekPlanEntry]) -> f64 {
    plan.iter().map(|week| week.weekly_mileage).sum()
}

/// Reported km summed over the plan's weeks; reports for weeks not in the
/// plan are ignored
pub fn completed_mileage(plan: &[WeekPlanEntry], facts: &CompletionFacts) -> f64 {
    plan.iter()
        .map(|week| parse_number(facts.reported_mileage(week.week_number)))
        .sum()
}

// ---------------------------------------------------------------------------
/// Progress Summary: everything the tracking view renders in one pass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub race_distance: String,
    pub race_date: String,
}

impl EventInfo {
    /// Present only when both distance and date were answered
    pub fn from_answers(answers: &QuestionnaireAnswers) -> Option<Self> {
        if answers.race_distance.trim().is_empty() || answers.race_date.trim().is_empty() {
            return None;
        }
        Some(Self {
            race_distance: answers.race_distance.clone(),
            race_date: answers.race_date.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub week_number: u32,
    pub progress: f64,
    pub complete: bool,
    pub status: WeekStatus,
    pub week_start: Option<NaiveDate>,
    pub week_end: Option<NaiveDate>,
    /// The seven calendar days of the week, empty without a start date
    pub days: Vec<NaiveDate>,
    pub mileage_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub overall_progress: f64,
    pub total_weeks: usize,
    pub completed_weeks: usize,
    pub total_mileage: f64,
    pub completed_mileage: f64,
    /// completed / total mileage, 0 when nothing is planned
    pub mileage_ratio: f64,
    pub event: Option<EventInfo>,
    pub weeks: Vec<WeekSummary>,
}

impl ProgressSummary {
    pub fn compute(
        plan: Option<&[WeekPlanEntry]>,
        facts: &CompletionFacts,
        answers: Option<&QuestionnaireAnswers>,
        today: NaiveDate,
    ) -> Self {
        let weeks_slice = plan.unwrap_or(&[]);
        let total = total_mileage(weeks_slice);
        let completed = completed_mileage(weeks_slice, facts);

        let weeks = weeks_slice
            .iter()
            .map(|week| {
                let span = week.start_date.map(week_span);
                WeekSummary {
                    week_number: week.week_number,
                    progress: week_progress(week, facts),
                    complete: is_week_complete(week, facts),
                    status: week_status(week, today),
                    week_start: span.map(|(start, _)| start),
                    week_end: span.map(|(_, end)| end),
                    days: days_in_week(week.start_date),
                    mileage_completed: mileage_completed(week, facts),
                }
            })
            .collect();

        Self {
            overall_progress: overall_progress(plan, facts),
            total_weeks: weeks_slice.len(),
            completed_weeks: completed_weeks(weeks_slice, facts),
            total_mileage: total,
            completed_mileage: completed,
            mileage_ratio: if total > 0.0 { completed / total } else { 0.0 },
            event: answers.and_then(EventInfo::from_answers),
            weeks,
        }
    }
}
