//! Local plan persistence
//!
//! Four independently keyed JSON documents in one SQLite table: the plan,
//! the event completion flags, the reported mileage and the raw
//! questionnaire answers. A document that no longer decodes is treated as
//! absent (logged, never fatal).

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{CompletionFacts, EventKey, QuestionnaireAnswers, WeekPlanEntry};

pub const KEY_PLAN: &str = "trainingPlan";
pub const KEY_EVENTS: &str = "completedEvents";
pub const KEY_MILEAGE: &str = "actualMileage";
pub const KEY_ANSWERS: &str = "planWizardAnswers";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Failed to encode stored value: {0}")]
  Encode(#[from] serde_json::Error),
}

pub struct PlanStore {
  pool: SqlitePool,
  /// Serializes read-modify-write updates of the fact documents
  write_lock: Mutex<()>,
}

impl PlanStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self {
      pool,
      write_lock: Mutex::new(()),
    }
  }

  /// ---------------------------------------------------------------------------
  /// Raw documents
  /// ---------------------------------------------------------------------------

  async fn read_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM plan_store WHERE key = ?1")
      .bind(key)
      .fetch_optional(&self.pool)
      .await?;
    Ok(value)
  }

  async fn write_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO plan_store (key, value, updated_at)
      VALUES (?1, ?2, CURRENT_TIMESTAMP)
      ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(key)
    .bind(value)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn delete(&self, keys: &[&str]) -> Result<(), StoreError> {
    for key in keys {
      sqlx::query("DELETE FROM plan_store WHERE key = ?1")
        .bind(*key)
        .execute(&self.pool)
        .await?;
    }
    Ok(())
  }

  async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
    let Some(raw) = self.read_raw(key).await? else {
      return Ok(None);
    };

    match serde_json::from_str(&raw) {
      Ok(value) => Ok(Some(value)),
      Err(e) => {
        warn!(key, error = %e, "stored value is not valid, treating as absent");
        Ok(None)
      }
    }
  }

  async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    self.write_raw(key, &raw).await
  }

  /// ---------------------------------------------------------------------------
  /// Plan
  /// ---------------------------------------------------------------------------

  pub async fn load_plan(&self) -> Result<Option<Vec<WeekPlanEntry>>, StoreError> {
    self.read_json(KEY_PLAN).await
  }

  /// Replace the stored plan wholesale
  pub async fn save_plan(&self, plan: &[WeekPlanEntry]) -> Result<(), StoreError> {
    debug!(weeks = plan.len(), "save_plan");
    self.write_json(KEY_PLAN, plan).await
  }

  /// Replace the plan with an imported one and drop the completion flags in
  /// one transaction. Reported mileage is kept.
  pub async fn replace_plan_from_import(&self, plan: &[WeekPlanEntry]) -> Result<(), StoreError> {
    let raw = serde_json::to_string(plan)?;
    let _guard = self.write_lock.lock().await;

    let mut tx = self.pool.begin().await?;
    sqlx::query(
      r#"
      INSERT INTO plan_store (key, value, updated_at)
      VALUES (?1, ?2, CURRENT_TIMESTAMP)
      ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(KEY_PLAN)
    .bind(&raw)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM plan_store WHERE key = ?1")
      .bind(KEY_EVENTS)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;

    debug!(weeks = plan.len(), "replace_plan_from_import");
    Ok(())
  }

  /// "Clear all data": the plan and both fact documents. Answers are kept.
  pub async fn clear_all(&self) -> Result<(), StoreError> {
    let _guard = self.write_lock.lock().await;
    self.delete(&[KEY_PLAN, KEY_EVENTS, KEY_MILEAGE]).await
  }

  /// ---------------------------------------------------------------------------
  /// Completion facts
  /// ---------------------------------------------------------------------------

  pub async fn load_facts(&self) -> Result<CompletionFacts, StoreError> {
    Ok(CompletionFacts {
      event_completed: self.read_json(KEY_EVENTS).await?.unwrap_or_default(),
      reported_mileage: self.read_json(KEY_MILEAGE).await?.unwrap_or_default(),
    })
  }

  /// Flip one completion flag and return its new value
  pub async fn toggle_event(&self, key: EventKey) -> Result<bool, StoreError> {
    let _guard = self.write_lock.lock().await;

    let mut facts = CompletionFacts {
      event_completed: self.read_json(KEY_EVENTS).await?.unwrap_or_default(),
      ..Default::default()
    };
    let completed = facts.toggle(&key);
    self.write_json(KEY_EVENTS, &facts.event_completed).await?;

    debug!(%key, completed, "toggle_event");
    Ok(completed)
  }

  pub async fn set_reported_mileage(&self, week: u32, value: &str) -> Result<(), StoreError> {
    let _guard = self.write_lock.lock().await;

    let mut facts = CompletionFacts {
      reported_mileage: self.read_json(KEY_MILEAGE).await?.unwrap_or_default(),
      ..Default::default()
    };
    facts.set_reported_mileage(week, value);
    self.write_json(KEY_MILEAGE, &facts.reported_mileage).await
  }

  /// ---------------------------------------------------------------------------
  /// Questionnaire answers
  /// ---------------------------------------------------------------------------

  pub async fn load_answers(&self) -> Result<Option<QuestionnaireAnswers>, StoreError> {
    self.read_json(KEY_ANSWERS).await
  }

  pub async fn save_answers(&self, answers: &QuestionnaireAnswers) -> Result<(), StoreError> {
    self.write_json(KEY_ANSWERS, answers).await
  }

  /// Wizard restart
  pub async fn clear_answers(&self) -> Result<(), StoreError> {
    self.delete(&[KEY_ANSWERS]).await
  }
}
