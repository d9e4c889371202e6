//! Plan generation, replacement, import and questionnaire handlers

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use super::{AppError, JsonBody, TextBody};
use crate::db::AppState;
use crate::import::import_plan_str;
use crate::models::plan::number_weeks;
use crate::models::{CompletionFacts, QuestionnaireAnswers, WeekPlanEntry};

/// Stored plan together with the facts recorded against it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanState {
  pub training_plan: Option<Vec<WeekPlanEntry>>,
  #[serde(flatten)]
  pub facts: CompletionFacts,
}

/// ---------------------------------------------------------------------------
/// Generation
/// ---------------------------------------------------------------------------

/// Generate a plan from the posted answers without storing anything
pub async fn generate_plan(
  State(state): State<Arc<AppState>>,
  JsonBody(answers): JsonBody<QuestionnaireAnswers>,
) -> Result<Json<Vec<WeekPlanEntry>>, AppError> {
  let _slot = state.begin_generation().ok_or_else(AppError::busy)?;
  let plan = state.generator.generate(&answers).await?;
  info!(provider = state.generator.provider_name(), weeks = plan.len(), "generated plan");
  Ok(Json(plan))
}

/// Generate from the stored questionnaire and make the result the current plan
pub async fn generate_stored_plan(
  State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WeekPlanEntry>>, AppError> {
  let answers = state
    .store
    .load_answers()
    .await?
    .filter(QuestionnaireAnswers::is_complete)
    .ok_or_else(|| AppError::bad_request("Questionnaire answers are incomplete"))?;

  let _slot = state.begin_generation().ok_or_else(AppError::busy)?;
  let plan = state.generator.generate(&answers).await?;
  state.store.save_plan(&plan).await?;

  info!(provider = state.generator.provider_name(), weeks = plan.len(), "generated and stored plan");
  Ok(Json(plan))
}

/// ---------------------------------------------------------------------------
/// Stored Plan
/// ---------------------------------------------------------------------------

pub async fn get_plan(State(state): State<Arc<AppState>>) -> Result<Json<PlanState>, AppError> {
  Ok(Json(PlanState {
    training_plan: state.store.load_plan().await?,
    facts: state.store.load_facts().await?,
  }))
}

/// Replace the current plan wholesale
pub async fn replace_plan(
  State(state): State<Arc<AppState>>,
  JsonBody(mut plan): JsonBody<Vec<WeekPlanEntry>>,
) -> Result<Json<Vec<WeekPlanEntry>>, AppError> {
  number_weeks(&mut plan);
  state.store.save_plan(&plan).await?;
  Ok(Json(plan))
}

/// Clear all data: the plan and every recorded fact
pub async fn clear_plan(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
  state.store.clear_all().await?;
  info!("cleared plan and progress");
  Ok(StatusCode::NO_CONTENT)
}

/// Replace the plan from a CSV upload. Completion flags start over; an
/// import that fails leaves the current plan untouched.
pub async fn import_csv(
  State(state): State<Arc<AppState>>,
  TextBody(body): TextBody,
) -> Result<Json<Vec<WeekPlanEntry>>, AppError> {
  let plan = import_plan_str(&body)?;
  state.store.replace_plan_from_import(&plan).await?;

  info!(weeks = plan.len(), "imported plan from CSV");
  Ok(Json(plan))
}

/// ---------------------------------------------------------------------------
/// Questionnaire
/// ---------------------------------------------------------------------------

pub async fn get_answers(
  State(state): State<Arc<AppState>>,
) -> Result<Json<Option<QuestionnaireAnswers>>, AppError> {
  Ok(Json(state.store.load_answers().await?))
}

pub async fn save_answers(
  State(state): State<Arc<AppState>>,
  JsonBody(answers): JsonBody<QuestionnaireAnswers>,
) -> Result<Json<QuestionnaireAnswers>, AppError> {
  state.store.save_answers(&answers).await?;
  Ok(Json(answers))
}

/// Restart the wizard
pub async fn clear_answers(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
  state.store.clear_answers().await?;
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use crate::commands::build_router;
  use crate::models::EventKey;
  use crate::test_utils::{body_json, mock_answers, mock_plan, send, test_state, StaticProvider};
  use axum::http::{Method, StatusCode};
  use serde_json::json;

  const CSV_HEADER: &str =
    "Week,Phase,Start,Long Run (km),Key Workout,Weekly Mileage (km),Long Run Pace";

  #[tokio::test]
  async fn test_generate_plan_returns_weeks() {
    let (state, _pool) = test_state(StaticProvider::reply(
      "Sure!\n```json\n[{\"weekNumber\":1,\"Phase\":\"Base\",\"weeklyMileage\":30}]\n```",
    ))
    .await;

    let body = serde_json::to_value(mock_answers()).unwrap();
    let resp = send(build_router(state.clone()), Method::POST, "/api/generate-plan", Some(body)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json[0]["weekNumber"], 1);
    assert_eq!(json[0]["Phase"], "Base");

    // Stateless: nothing was stored
    assert!(state.store.load_plan().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_generate_plan_failure_is_500_with_message() {
    let (state, _pool) = test_state(StaticProvider::failing("quota exceeded")).await;

    let body = serde_json::to_value(mock_answers()).unwrap();
    let resp = send(build_router(state), Method::POST, "/api/generate-plan", Some(body)).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
      body_json(resp).await,
      json!({ "error": "Static LLM error: quota exceeded" })
    );
  }

  #[tokio::test]
  async fn test_generate_plan_unparseable_reply() {
    let (state, _pool) = test_state(StaticProvider::reply("I cannot generate a plan.")).await;

    let resp = send(build_router(state), Method::POST, "/api/generate-plan", Some(json!({}))).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["error"], "Could not parse plan JSON");
  }

  #[tokio::test]
  async fn test_generate_rejected_while_busy() {
    let (state, _pool) = test_state(StaticProvider::reply("[]")).await;
    let _slot = state.begin_generation().unwrap();

    let resp = send(build_router(state.clone()), Method::POST, "/api/generate-plan", Some(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn test_generate_stored_plan_requires_complete_answers() {
    let (state, _pool) = test_state(StaticProvider::reply("[]")).await;

    let resp = send(build_router(state.clone()), Method::POST, "/api/plan/generate", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut answers = mock_answers();
    answers.race_date = String::new();
    state.store.save_answers(&answers).await.unwrap();

    let resp = send(build_router(state), Method::POST, "/api/plan/generate", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn test_generate_stored_plan_saves_result() {
    let (state, _pool) = test_state(StaticProvider::reply(
      r#"[{"weekNumber":1,"Phase":"Base"},{"weekNumber":2,"Phase":"Taper"}]"#,
    ))
    .await;
    state.store.save_answers(&mock_answers()).await.unwrap();

    let resp = send(build_router(state.clone()), Method::POST, "/api/plan/generate", None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = state.store.load_plan().await.unwrap().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].phase, "Taper");
  }

  #[tokio::test]
  async fn test_plan_replace_get_and_clear() {
    let (state, _pool) = test_state(StaticProvider::reply("[]")).await;

    let plan = serde_json::to_value(mock_plan()).unwrap();
    let resp = send(build_router(state.clone()), Method::PUT, "/api/plan", Some(plan)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    state.store.toggle_event(EventKey::key_workout(1)).await.unwrap();
    state.store.set_reported_mileage(1, "30").await.unwrap();

    let resp = send(build_router(state.clone()), Method::GET, "/api/plan", None).await;
    let json = body_json(resp).await;
    assert_eq!(json["trainingPlan"].as_array().unwrap().len(), 4);
    assert_eq!(json["completedEvents"]["week1-keyworkout"], true);
    assert_eq!(json["actualMileage"]["1"], "30");

    let resp = send(build_router(state.clone()), Method::DELETE, "/api/plan", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(build_router(state), Method::GET, "/api/plan", None).await;
    let json = body_json(resp).await;
    assert!(json["trainingPlan"].is_null());
    assert_eq!(json["completedEvents"], json!({}));
    assert_eq!(json["actualMileage"], json!({}));
  }

  #[tokio::test]
  async fn test_import_csv_replaces_plan_and_resets_flags() {
    let (state, _pool) = test_state(StaticProvider::reply("[]")).await;
    state.store.save_plan(&mock_plan()).await.unwrap();
    state.store.toggle_event(EventKey::long_run(1)).await.unwrap();

    let csv = format!("{}\n1,Base,2024-07-01,10,Strides,25,6:10-6:30/km\n", CSV_HEADER);
    let resp = send_text(state.clone(), "/api/plan/import", csv).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let plan = state.store.load_plan().await.unwrap().unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].weekly_mileage, 25.0);
    assert!(state.store.load_facts().await.unwrap().event_completed.is_empty());
  }

  #[tokio::test]
  async fn test_import_missing_column_keeps_current_plan() {
    let (state, _pool) = test_state(StaticProvider::reply("[]")).await;
    state.store.save_plan(&mock_plan()).await.unwrap();

    let csv = "Week,Phase,Start,Long Run (km),Key Workout,Weekly Mileage (km)\n1,Base,2024-07-01,10,Strides,25\n";
    let resp = send_text(state.clone(), "/api/plan/import", csv.to_string()).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
      body_json(resp).await["error"],
      "Missing required columns: Long Run Pace"
    );
    assert_eq!(state.store.load_plan().await.unwrap().unwrap().len(), 4);
  }

  #[tokio::test]
  async fn test_answers_lifecycle() {
    let (state, _pool) = test_state(StaticProvider::reply("[]")).await;

    let resp = send(build_router(state.clone()), Method::GET, "/api/answers", None).await;
    assert!(body_json(resp).await.is_null());

    let answers = serde_json::to_value(mock_answers()).unwrap();
    let resp = send(build_router(state.clone()), Method::PUT, "/api/answers", Some(answers)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(build_router(state.clone()), Method::GET, "/api/answers", None).await;
    assert_eq!(body_json(resp).await["raceDistance"], "Marathon");

    let resp = send(build_router(state.clone()), Method::DELETE, "/api/answers", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(state.store.load_answers().await.unwrap().is_none());
  }

  async fn send_text(
    state: std::sync::Arc<crate::db::AppState>,
    uri: &str,
    body: String,
  ) -> axum::response::Response {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    build_router(state)
      .oneshot(
        Request::builder()
          .method(Method::POST)
          .uri(uri)
          .header("content-type", "text/csv")
          .body(Body::from(body))
          .unwrap(),
      )
      .await
      .unwrap()
  }
}
