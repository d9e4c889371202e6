//! Google Gemini generateContent provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{LlmError, PlanProvider};
use crate::config::GoogleConfig;

/// ---------------------------------------------------------------------------
/// API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
  contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
  role: &'a str,
  parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
  text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
  text: Option<String>,
}

impl GenerateResponse {
  /// `candidates[0].content.parts[0].text`, empty when any step is missing
  fn into_text(self) -> String {
    self
      .candidates
      .into_iter()
      .next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next())
      .and_then(|p| p.text)
      .unwrap_or_default()
  }
}

/// ---------------------------------------------------------------------------
/// Client
/// ---------------------------------------------------------------------------

pub struct GoogleClient {
  client: Client,
  api_url: String,
  api_key: String,
}

impl GoogleClient {
  pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      api_url: api_url.into(),
      api_key: api_key.into(),
    }
  }

  pub fn from_config(config: &GoogleConfig) -> Self {
    Self::new(&config.api_url, &config.api_key)
  }

  /// Endpoint with the API key appended as the `key` query parameter
  fn endpoint(&self) -> Result<Url, LlmError> {
    let mut url = Url::parse(&self.api_url)?;
    url.query_pairs_mut().append_pair("key", &self.api_key);
    Ok(url)
  }
}

#[async_trait]
impl PlanProvider for GoogleClient {
  fn name(&self) -> &'static str {
    "Google Gemini"
  }

  async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
    let request = GenerateRequest {
      contents: vec![Content {
        role: "user",
        parts: vec![Part { text: prompt }],
      }],
    };

    // Log the configured URL, never the keyed endpoint
    debug!(url = %self.api_url, prompt_len = prompt.len(), "google: sending request");

    let response = self
      .client
      .post(self.endpoint()?)
      .json(&request)
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      warn!(%status, "google: request failed");
      return Err(LlmError::Provider {
        provider: self.name(),
        body,
      });
    }

    let parsed: GenerateResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    Ok(parsed.into_text())
  }
}
