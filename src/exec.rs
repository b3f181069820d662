use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

use crate::steps::ExecutionStep;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExecConfig {
  pub base_url: String,
  pub api_token: String,
}

impl ExecConfig {
  pub fn from_env() -> Result<Self, ExecError> {
    let base_url =
      env::var("EXEC_API_URL").map_err(|_| ExecError::MissingConfig("EXEC_API_URL".into()))?;
    Url::parse(&base_url)
      .map_err(|e| ExecError::InvalidConfig(format!("EXEC_API_URL: {}", e)))?;

    Ok(Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      api_token: env::var("EXEC_API_TOKEN")
        .map_err(|_| ExecError::MissingConfig("EXEC_API_TOKEN".into()))?,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Execution API error: {0}")]
  Api(String),

  #[error("Not authenticated with execution service")]
  NotAuthenticated,
}

impl Serialize for ExecError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Wire Types
/// ---------------------------------------------------------------------------

/// Payload for creating one workout on the execution service. Scheduling is
/// a separate call keyed on the returned external id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutUpload {
  pub name: String,
  pub steps: Vec<ExecutionStep>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
  id: String,
}

#[derive(Serialize)]
struct ScheduleRequest {
  date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
  scheduled: Option<bool>,
}

/// ---------------------------------------------------------------------------
/// Execution API
/// ---------------------------------------------------------------------------

/// Seam between the upload commands and the remote execution service.
pub trait ExecutionApi {
  fn upload_workout(
    &self,
    upload: &WorkoutUpload,
  ) -> impl std::future::Future<Output = Result<String, ExecError>> + Send;

  fn schedule_workout(
    &self,
    external_id: &str,
    date: NaiveDate,
  ) -> impl std::future::Future<Output = Result<bool, ExecError>> + Send;

  fn delete_workout(
    &self,
    external_id: &str,
  ) -> impl std::future::Future<Output = Result<(), ExecError>> + Send;
}

pub struct HttpExecutionClient {
  client: Client,
  base_url: String,
  api_token: String,
}

impl HttpExecutionClient {
  pub fn new(config: ExecConfig) -> Self {
    Self {
      client: Client::new(),
      base_url: config.base_url,
      api_token: config.api_token,
    }
  }
}

impl ExecutionApi for HttpExecutionClient {
  async fn upload_workout(&self, upload: &WorkoutUpload) -> Result<String, ExecError> {
    let url = format!("{}/workouts", self.base_url);

    let response = self
      .client
      .post(&url)
      .header("Authorization", format!("Bearer {}", self.api_token))
      .json(upload)
      .send()
      .await?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
      return Err(ExecError::NotAuthenticated);
    }

    if !response.status().is_success() {
      let error_text = response.text().await.unwrap_or_default();
      return Err(ExecError::Api(format!("Workout upload failed: {}", error_text)));
    }

    let upload_response: UploadResponse = response.json().await?;
    Ok(upload_response.id)
  }

  async fn schedule_workout(&self, external_id: &str, date: NaiveDate) -> Result<bool, ExecError> {
    let url = format!("{}/workouts/{}/schedule", self.base_url, external_id);

    let response = self
      .client
      .post(&url)
      .header("Authorization", format!("Bearer {}", self.api_token))
      .json(&ScheduleRequest { date })
      .send()
      .await?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
      return Err(ExecError::NotAuthenticated);
    }

    if !response.status().is_success() {
      let error_text = response.text().await.unwrap_or_default();
      return Err(ExecError::Api(format!("Workout schedule failed: {}", error_text)));
    }

    // A success status with no explicit flag in the body counts as scheduled.
    let scheduled = response
      .json::<ScheduleResponse>()
      .await
      .ok()
      .and_then(|b| b.scheduled)
      .unwrap_or(true);
    Ok(scheduled)
  }

  async fn delete_workout(&self, external_id: &str) -> Result<(), ExecError> {
    let url = format!("{}/workouts/{}", self.base_url, external_id);

    let response = self
      .client
      .delete(&url)
      .header("Authorization", format!("Bearer {}", self.api_token))
      .send()
      .await?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
      return Err(ExecError::NotAuthenticated);
    }

    // Already removed on the remote side counts as deleted.
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(());
    }

    if !response.status().is_success() {
      let error_text = response.text().await.unwrap_or_default();
      return Err(ExecError::Api(format!("Workout delete failed: {}", error_text)));
    }

    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
