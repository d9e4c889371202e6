mod commands;
mod config;
mod dates;
mod db;
mod import;
mod llm;
mod models;
mod progress;
mod prompt;
mod store;

#[cfg(test)]
mod test_utils;

use config::Config;
use db::AppState;
use llm::PlanGenerator;
use std::sync::Arc;
use store::PlanStore;
use tracing::{error, info, warn};

pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let config = Config::from_env();
  if config.missing_api_key() {
    warn!(provider = %config.provider, "no API key configured, provider calls will be rejected");
  }

  let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
    Ok(runtime) => runtime,
    Err(e) => {
      error!("Failed to start async runtime: {}", e);
      return;
    }
  };

  runtime.block_on(async move {
    let pool = match db::initialize_db(&config.db_path).await {
      Ok(pool) => pool,
      Err(e) => {
        error!("Failed to initialize database: {}", e);
        return;
      }
    };

    let state = Arc::new(AppState::new(
      PlanStore::new(pool.clone()),
      PlanGenerator::from_config(&config),
    ));

    if let Err(e) = commands::serve(state, config.port).await {
      error!("Server error: {}", e);
    }

    pool.close().await;
    info!("database closed");
  });
}
