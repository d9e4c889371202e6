//! DeepSeek chat-completions provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{LlmError, PlanProvider};
use crate::config::DeepSeekConfig;
use crate::prompt::COACH_SYSTEM_PROMPT;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1800;

/// ---------------------------------------------------------------------------
/// API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
  temperature: f32,
  max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

impl ChatResponse {
  /// `choices[0].message.content`, empty when any step is missing
  fn into_text(self) -> String {
    self
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message)
      .and_then(|m| m.content)
      .unwrap_or_default()
  }
}

/// ---------------------------------------------------------------------------
/// Client
/// ---------------------------------------------------------------------------

pub struct DeepSeekClient {
  client: Client,
  api_url: String,
  api_key: String,
  model: String,
}

impl DeepSeekClient {
  pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      api_url: api_url.into(),
      api_key: api_key.into(),
      model: model.into(),
    }
  }

  pub fn from_config(config: &DeepSeekConfig) -> Self {
    Self::new(&config.api_url, &config.api_key, &config.model)
  }
}

#[async_trait]
impl PlanProvider for DeepSeekClient {
  fn name(&self) -> &'static str {
    "DeepSeek"
  }

  async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
    let request = ChatRequest {
      model: &self.model,
      messages: vec![
        ChatMessage {
          role: "system",
          content: COACH_SYSTEM_PROMPT,
        },
        ChatMessage {
          role: "user",
          content: prompt,
        },
      ],
      temperature: TEMPERATURE,
      max_tokens: MAX_TOKENS,
    };

    debug!(url = %self.api_url, model = %self.model, prompt_len = prompt.len(), "deepseek: sending request");

    let response = self
      .client
      .post(&self.api_url)
      .bearer_auth(&self.api_key)
      .json(&request)
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      warn!(%status, "deepseek: request failed");
      return Err(LlmError::Provider {
        provider: self.name(),
        body,
      });
    }

    let parsed: ChatResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    Ok(parsed.into_text())
  }
}
