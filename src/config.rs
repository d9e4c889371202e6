use std::env;
use std::path::PathBuf;

use tracing::warn;

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
pub const DEFAULT_GOOGLE_API_URL: &str =
  "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
pub const DEFAULT_DB_PATH: &str = "stride-coach.db";

/// ---------------------------------------------------------------------------
/// Provider Selection
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
  #[default]
  DeepSeek,
  Google,
}

impl ProviderKind {
  /// Case-insensitive; anything unrecognized (or absent) selects DeepSeek
  pub fn from_config_value(value: Option<&str>) -> Self {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
      Some("google") => Self::Google,
      _ => Self::DeepSeek,
    }
  }
}

impl std::fmt::Display for ProviderKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::DeepSeek => write!(f, "deepseek"),
      Self::Google => write!(f, "google"),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
  pub api_url: String,
  pub api_key: String,
  pub model: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
  pub api_url: String,
  pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub port: u16,
  pub provider: ProviderKind,
  pub deepseek: DeepSeekConfig,
  pub google: GoogleConfig,
  pub db_path: PathBuf,
}

fn var_or(name: &str, default: &str) -> String {
  env::var(name)
    .ok()
    .filter(|v| !v.trim().is_empty())
    .unwrap_or_else(|| default.to_string())
}

impl Config {
  /// Build configuration from the process environment.
  /// Call `dotenvy::dotenv()` first to pick up a local `.env`.
  pub fn from_env() -> Self {
    let port = match env::var("PORT") {
      Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
        warn!(value = %raw, "PORT is not a valid port number, using {}", DEFAULT_PORT);
        DEFAULT_PORT
      }),
      Err(_) => DEFAULT_PORT,
    };

    Self {
      port,
      provider: ProviderKind::from_config_value(env::var("LLM_PROVIDER").ok().as_deref()),
      deepseek: DeepSeekConfig {
        api_url: var_or("DEEPSEEK_API_URL", DEFAULT_DEEPSEEK_API_URL),
        api_key: env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
        model: var_or("DEEPSEEK_MODEL", DEFAULT_DEEPSEEK_MODEL),
      },
      google: GoogleConfig {
        api_url: var_or("GOOGLE_API_URL", DEFAULT_GOOGLE_API_URL),
        api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
      },
      db_path: PathBuf::from(var_or("PLAN_DB_PATH", DEFAULT_DB_PATH)),
    }
  }

  /// API key of the selected provider is empty
  pub fn missing_api_key(&self) -> bool {
    match self.provider {
      ProviderKind::DeepSeek => self.deepseek.api_key.is_empty(),
      ProviderKind::Google => self.google.api_key.is_empty(),
    }
  }
}
