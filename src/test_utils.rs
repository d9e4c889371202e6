//! Test utilities and helpers for unit and handler tests
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - A canned plan provider
//! - Router request helpers
//! - Helper assertions

use crate::dates::to_date_safe;
use crate::db::AppState;
use crate::llm::{LlmError, PlanGenerator, PlanProvider};
use crate::models::{QuestionnaireAnswers, WeekPlanEntry};
use crate::store::PlanStore;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A complete questionnaire for a marathon in October 2024
pub fn mock_answers() -> QuestionnaireAnswers {
  QuestionnaireAnswers {
    race_distance: "Marathon".to_string(),
    race_date: "2024-10-13".to_string(),
    target_time: "3:45:00".to_string(),
    recent_race_distance: "Half Marathon".to_string(),
    recent_race_time: "1:48:00".to_string(),
    current_mileage: "40".to_string(),
    long_run: "16".to_string(),
    easy_pace: "6:00/km".to_string(),
    experience: "Intermediate".to_string(),
    days_per_week: "5".to_string(),
    constraints: "No runs on Fridays".to_string(),
  }
}

/// One plan week starting on `start` (YYYY-MM-DD)
pub fn mock_week(week_number: u32, start: &str, weekly_mileage: f64) -> WeekPlanEntry {
  WeekPlanEntry {
    week_number,
    phase: "Base".to_string(),
    start_date: to_date_safe(start),
    long_run_km: weekly_mileage / 3.0,
    weekly_mileage,
    key_workout: "5x1km @ 4:50/km".to_string(),
    long_run_pace: "6:00-6:20/km".to_string(),
  }
}

/// Four weeks from 2024-06-03 with 30/35/40/25 km targets
pub fn mock_plan() -> Vec<WeekPlanEntry> {
  vec![
    mock_week(1, "2024-06-03", 30.0),
    mock_week(2, "2024-06-10", 35.0),
    mock_week(3, "2024-06-17", 40.0),
    mock_week(4, "2024-06-24", 25.0),
  ]
}

/// ---------------------------------------------------------------------------
/// Canned Provider
/// ---------------------------------------------------------------------------

/// Provider that answers every prompt with the same completion text
pub struct StaticProvider {
  reply: Result<String, String>,
  last_prompt: Mutex<Option<String>>,
}

impl StaticProvider {
  pub fn reply(text: &str) -> Self {
    Self {
      reply: Ok(text.to_string()),
      last_prompt: Mutex::new(None),
    }
  }

  /// Fail every call as a provider returning `body`
  pub fn failing(body: &str) -> Self {
    Self {
      reply: Err(body.to_string()),
      last_prompt: Mutex::new(None),
    }
  }

  pub fn last_prompt(&self) -> Option<String> {
    self.last_prompt.lock().expect("prompt lock poisoned").clone()
  }
}

#[async_trait]
impl PlanProvider for StaticProvider {
  fn name(&self) -> &'static str {
    "Static"
  }

  async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
    *self.last_prompt.lock().expect("prompt lock poisoned") = Some(prompt.to_string());
    match &self.reply {
      Ok(text) => Ok(text.clone()),
      Err(body) => Err(LlmError::Provider {
        provider: self.name(),
        body: body.clone(),
      }),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Router Helpers
/// ---------------------------------------------------------------------------

/// Shared state over a fresh in-memory store and the given provider
pub async fn test_state(provider: StaticProvider) -> (Arc<AppState>, SqlitePool) {
  let pool = setup_test_db().await;
  let state = AppState::new(
    PlanStore::new(pool.clone()),
    PlanGenerator::with_provider(Arc::new(provider)),
  );
  (Arc::new(state), pool)
}

/// Send one request through the router, with an optional JSON body
pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response {
  let builder = Request::builder().method(method).uri(uri);
  let request = match body {
    Some(json) => builder
      .header("content-type", "application/json")
      .body(Body::from(json.to_string())),
    None => builder.body(Body::empty()),
  }
  .expect("Failed to build request");

  app.oneshot(request).await.expect("Router failed")
}

pub async fn body_json(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .expect("Failed to read body");
  serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = (($left) - ($right) as f64).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name = 'plan_store'",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 1);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let answers = mock_answers();
    assert!(answers.is_complete());

    let plan = mock_plan();
    assert_eq!(plan.len(), 4);
    assert!(plan.iter().all(|w| w.start_date.is_some()));
    let numbers: Vec<u32> = plan.iter().map(|w| w.week_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
  }

  #[tokio::test]
  async fn test_static_provider_records_prompt() {
    let provider = StaticProvider::reply("[]");
    assert_eq!(provider.complete("hello").await.unwrap(), "[]");
    assert_eq!(provider.last_prompt().as_deref(), Some("hello"));

    let failing = StaticProvider::failing("boom");
    assert!(failing.complete("hello").await.is_err());
  }
}
