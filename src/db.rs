use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::llm::PlanGenerator;
use crate::store::PlanStore;

pub type DbPool = SqlitePool;

/// Application state shared by every request handler
pub struct AppState {
  pub store: PlanStore,
  pub generator: PlanGenerator,
  generating: AtomicBool,
}

impl AppState {
  pub fn new(store: PlanStore, generator: PlanGenerator) -> Self {
    Self {
      store,
      generator,
      generating: AtomicBool::new(false),
    }
  }

  /// Claim the single generation slot. `None` while another generation is
  /// outstanding; the slot frees when the guard drops.
  pub fn begin_generation(&self) -> Option<GenerationGuard<'_>> {
    self
      .generating
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| GenerationGuard {
        flag: &self.generating,
      })
  }
}

pub struct GenerationGuard<'a> {
  flag: &'a AtomicBool,
}

impl Drop for GenerationGuard<'_> {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::Release);
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, Box<dyn std::error::Error>> {
  if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }

  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
  info!(path = %db_path.display(), "initializing plan store");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("plan store ready");

  Ok(pool)
}
