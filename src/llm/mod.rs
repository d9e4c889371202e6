//! LLM integration for plan generation
//!
//! Each backing provider implements [`PlanProvider`]. [`PlanGenerator`] picks
//! one from configuration and exposes a single answers-to-plan operation.

mod deepseek;
mod google;

pub use deepseek::DeepSeekClient;
pub use google::GoogleClient;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, ProviderKind};
use crate::models::plan::number_weeks;
use crate::models::{QuestionnaireAnswers, WeekPlanEntry};
use crate::prompt::build_plan_prompt;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum LlmError {
  /// Non-success status from the provider; carries the raw response body
  #[error("{provider} LLM error: {body}")]
  Provider { provider: &'static str, body: String },

  #[error("Could not parse plan JSON")]
  PlanParse,

  #[error("Request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Invalid provider URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("Invalid response: {0}")]
  InvalidResponse(String),
}

/// ---------------------------------------------------------------------------
/// Provider Interface
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait PlanProvider: Send + Sync {
  /// Display name used in logs and error messages
  fn name(&self) -> &'static str;

  /// Send a rendered prompt and return the model's completion text
  async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

  /// Render the prompt for today, submit it, and recover a plan from the reply
  async fn generate(&self, answers: &QuestionnaireAnswers) -> Result<Vec<WeekPlanEntry>, LlmError> {
    let prompt = build_plan_prompt(answers, Utc::now().date_naive());
    let text = self.complete(&prompt).await?;
    parse_plan(&text).inspect_err(|_| {
      warn!(provider = self.name(), text_len = text.len(), "completion did not contain a plan");
    })
  }
}

/// ---------------------------------------------------------------------------
/// Plan Recovery
/// ---------------------------------------------------------------------------

/// First `[` through last `]`, spanning newlines
static ARRAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\[[\s\S]*\]").expect("array pattern is valid")
});

/// Recover a plan from free-form completion text.
///
/// The whole text is parsed as a JSON array first. Models often wrap the
/// array in prose or code fences, so when that fails the first bracketed
/// span is parsed instead. Element shape is not validated: elements that
/// are not week objects become empty weeks.
pub fn parse_plan(text: &str) -> Result<Vec<WeekPlanEntry>, LlmError> {
  let elements: Vec<Value> = match serde_json::from_str(text) {
    Ok(elements) => elements,
    Err(_) => {
      let candidate = ARRAY_PATTERN.find(text).ok_or(LlmError::PlanParse)?;
      debug!(
        start = candidate.start(),
        end = candidate.end(),
        "parse_plan: recovered bracketed array"
      );
      serde_json::from_str(candidate.as_str()).map_err(|_| LlmError::PlanParse)?
    }
  };

  let mut plan: Vec<WeekPlanEntry> = elements.into_iter().map(WeekPlanEntry::from_value).collect();
  number_weeks(&mut plan);
  Ok(plan)
}

/// ---------------------------------------------------------------------------
/// Generator
/// ---------------------------------------------------------------------------

/// Build the provider selected by `config.provider`
pub fn create_provider(config: &Config) -> Arc<dyn PlanProvider> {
  match config.provider {
    ProviderKind::Google => Arc::new(GoogleClient::from_config(&config.google)),
    ProviderKind::DeepSeek => Arc::new(DeepSeekClient::from_config(&config.deepseek)),
  }
}

/// Uniform answers-to-plan entry point over exactly one provider.
/// No fallback between providers and no caching.
#[derive(Clone)]
pub struct PlanGenerator {
  provider: Arc<dyn PlanProvider>,
}

impl PlanGenerator {
  pub fn from_config(config: &Config) -> Self {
    let provider = create_provider(config);
    info!(provider = provider.name(), "plan generator ready");
    Self { provider }
  }

  pub fn with_provider(provider: Arc<dyn PlanProvider>) -> Self {
    Self { provider }
  }

  pub fn provider_name(&self) -> &'static str {
    self.provider.name()
  }

  pub async fn generate(&self, answers: &QuestionnaireAnswers) -> Result<Vec<WeekPlanEntry>, LlmError> {
    self.provider.generate(answers).await
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
