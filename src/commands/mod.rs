//! HTTP surface
//!
//! Thin handlers over the plan store, the generator and the progress model.
//! Every failure, including a malformed body or path, is reported as
//! `{ "error": <message> }`.

pub mod plan;
pub mod progress;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, StringRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::db::AppState;
use crate::import::ImportError;
use crate::llm::LlmError;
use crate::store::StoreError;

/// ---------------------------------------------------------------------------
/// Error type
/// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
  status: StatusCode,
  message: String,
}

impl AppError {
  pub fn bad_request(msg: impl Into<String>) -> Self {
    Self {
      status: StatusCode::BAD_REQUEST,
      message: msg.into(),
    }
  }

  pub fn busy() -> Self {
    Self {
      status: StatusCode::CONFLICT,
      message: "A plan is already being generated".to_string(),
    }
  }

  pub fn internal(msg: impl Into<String>) -> Self {
    Self {
      status: StatusCode::INTERNAL_SERVER_ERROR,
      message: msg.into(),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> axum::response::Response {
    let body = json!({ "error": self.message });
    (self.status, Json(body)).into_response()
  }
}

/// Generation failures are all reported as a plain 500
impl From<LlmError> for AppError {
  fn from(err: LlmError) -> Self {
    warn!(error = %err, "plan generation failed");
    Self::internal(err.to_string())
  }
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    warn!(error = %err, "plan store failure");
    Self::internal(err.to_string())
  }
}

impl From<ImportError> for AppError {
  fn from(err: ImportError) -> Self {
    Self::bad_request(err.to_string())
  }
}

impl From<JsonRejection> for AppError {
  fn from(rejection: JsonRejection) -> Self {
    Self {
      status: rejection.status(),
      message: rejection.body_text(),
    }
  }
}

impl From<PathRejection> for AppError {
  fn from(rejection: PathRejection) -> Self {
    Self {
      status: rejection.status(),
      message: rejection.body_text(),
    }
  }
}

impl From<StringRejection> for AppError {
  fn from(rejection: StringRejection) -> Self {
    Self {
      status: rejection.status(),
      message: rejection.body_text(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Extractors
/// ---------------------------------------------------------------------------

/// JSON request body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParams<T>(pub T);

/// Plain-text request body
pub struct TextBody(pub String);

impl<S> FromRequest<S> for TextBody
where
  S: Send + Sync,
{
  type Rejection = AppError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let text = String::from_request(req, state).await?;
    Ok(Self(text))
  }
}

/// ---------------------------------------------------------------------------
/// Router
/// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/generate-plan", post(plan::generate_plan))
    .route(
      "/api/answers",
      get(plan::get_answers)
        .put(plan::save_answers)
        .delete(plan::clear_answers),
    )
    .route(
      "/api/plan",
      get(plan::get_plan)
        .put(plan::replace_plan)
        .delete(plan::clear_plan),
    )
    .route("/api/plan/generate", post(plan::generate_stored_plan))
    .route("/api/plan/import", post(plan::import_csv))
    .route(
      "/api/weeks/{week}/events/{kind}/toggle",
      post(progress::toggle_event),
    )
    .route("/api/weeks/{week}/mileage", put(progress::set_mileage))
    .route("/api/progress", get(progress::get_progress))
    .layer(CorsLayer::permissive())
    .with_state(state)
}

/// ---------------------------------------------------------------------------
/// Entry point
/// ---------------------------------------------------------------------------

pub async fn serve(state: Arc<AppState>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
  let app = build_router(state);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!("server listening on http://localhost:{}", port);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("server shut down");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for Ctrl+C");
    std::future::pending::<()>().await;
  }
}

async fn health() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}
