use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The manually toggled events tracked for every week.
/// Mileage is the third tracked event but is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  KeyWorkout,
  LongRun,
}

impl std::fmt::Display for EventKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::KeyWorkout => write!(f, "keyworkout"),
      Self::LongRun => write!(f, "longrun"),
    }
  }
}

impl std::str::FromStr for EventKind {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "keyworkout" => Ok(Self::KeyWorkout),
      "longrun" => Ok(Self::LongRun),
      _ => Err(format!("Unknown event kind: {}", s)),
    }
  }
}

/// Key of one completion flag, persisted as `week<N>-<kind>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
  pub week: u32,
  pub kind: EventKind,
}

impl EventKey {
  pub fn new(week: u32, kind: EventKind) -> Self {
    Self { week, kind }
  }

  pub fn key_workout(week: u32) -> Self {
    Self::new(week, EventKind::KeyWorkout)
  }

  pub fn long_run(week: u32) -> Self {
    Self::new(week, EventKind::LongRun)
  }
}

impl std::fmt::Display for EventKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "week{}-{}", self.week, self.kind)
  }
}

/// User-entered facts recorded against an immutable plan.
///
/// The two maps are independent and are mutated one key at a time.
/// Whether a week's mileage target was met is always derived from
/// `reported_mileage`, so no flag for it exists here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionFacts {
  #[serde(rename = "completedEvents", default)]
  pub event_completed: BTreeMap<String, bool>,

  #[serde(rename = "actualMileage", default)]
  pub reported_mileage: BTreeMap<u32, String>,
}

impl CompletionFacts {
  /// Absent keys read as not completed
  pub fn is_completed(&self, key: &EventKey) -> bool {
    self
      .event_completed
      .get(&key.to_string())
      .copied()
      .unwrap_or(false)
  }

  /// Absent weeks read as the empty string (not yet reported)
  pub fn reported_mileage(&self, week: u32) -> &str {
    self
      .reported_mileage
      .get(&week)
      .map(String::as_str)
      .unwrap_or("")
  }

  /// Flip a completion flag and return its new value
  pub fn toggle(&mut self, key: &EventKey) -> bool {
    let next = !self.is_completed(key);
    self.event_completed.insert(key.to_string(), next);
    next
  }

  pub fn set_reported_mileage(&mut self, week: u32, value: impl Into<String>) {
    self.reported_mileage.insert(week, value.into());
  }
}
