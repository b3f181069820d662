use serde::Serialize;

/// Errors raised by the planning core.
///
/// `InvalidInput` is a programmer/input mistake raised at a function boundary;
/// the other variants are expected runtime conditions surfaced as values.
/// Plan-safety findings are not errors at all - see `safety::SafetyReport`.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Database error: {0}")]
  Database(String),

  #[error("Serialization error: {0}")]
  Serialization(String),
}

impl Serialize for PlanError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

impl From<sqlx::Error> for PlanError {
  fn from(e: sqlx::Error) -> Self {
    PlanError::Database(e.to_string())
  }
}

impl From<serde_json::Error> for PlanError {
  fn from(e: serde_json::Error) -> Self {
    PlanError::Serialization(e.to_string())
  }
}
