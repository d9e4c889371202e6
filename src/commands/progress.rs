//! Completion tracking handlers

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AppError, JsonBody, PathParams};
use crate::db::AppState;
use crate::models::{EventKey, EventKind};
use crate::progress::ProgressSummary;

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
  pub key: String,
  pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct MileageUpdate {
  #[serde(default)]
  pub value: String,
}

#[derive(Debug, Serialize)]
pub struct MileageResponse {
  pub week: u32,
  pub value: String,
}

pub async fn toggle_event(
  State(state): State<Arc<AppState>>,
  PathParams((week, kind)): PathParams<(u32, String)>,
) -> Result<Json<ToggleResponse>, AppError> {
  let kind: EventKind = kind.parse().map_err(AppError::bad_request)?;
  let key = EventKey::new(week, kind);
  let completed = state.store.toggle_event(key).await?;

  Ok(Json(ToggleResponse {
    key: key.to_string(),
    completed,
  }))
}

/// Record the runner's reported mileage for one week. Free text; anything
/// non-numeric counts as 0 when progress is derived.
pub async fn set_mileage(
  State(state): State<Arc<AppState>>,
  PathParams(week): PathParams<u32>,
  JsonBody(update): JsonBody<MileageUpdate>,
) -> Result<Json<MileageResponse>, AppError> {
  state.store.set_reported_mileage(week, &update.value).await?;
  debug!(week, value = %update.value, "reported mileage");

  Ok(Json(MileageResponse {
    week,
    value: update.value,
  }))
}

/// Derived progress for the stored plan, relative to today's local date
pub async fn get_progress(
  State(state): State<Arc<AppState>>,
) -> Result<Json<ProgressSummary>, AppError> {
  let plan = state.store.load_plan().await?;
  let facts = state.store.load_facts().await?;
  let answers = state.store.load_answers().await?;

  Ok(Json(ProgressSummary::compute(
    plan.as_deref(),
    &facts,
    answers.as_ref(),
    Local::now().date_naive(),
  )))
}
