use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;

use crate::error::PlanError;

pub type DbPool = SqlitePool;

/// Application state holding the database connection pool
pub struct AppState {
  pub db: DbPool,
}

/// Initialize the database connection pool and run migrations.
/// The parent directory is created if it does not exist.
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, PlanError> {
  if let Some(parent) = db_path.parent() {
    fs::create_dir_all(parent)
      .map_err(|e| PlanError::InvalidInput(format!("Failed to create data dir: {}", e)))?;
  }

  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

  tracing::info!(path = %db_path.display(), "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .map_err(|e| PlanError::Database(e.to_string()))?;

  Ok(pool)
}
