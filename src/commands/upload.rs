use chrono::NaiveDate;
use serde::Serialize;

use crate::db::AppState;
use crate::exec::{ExecutionApi, WorkoutUpload};
use crate::models::plan::TrainingPlan;
use crate::models::workout::PlannedWorkout;
use crate::steps::build_steps;
use crate::store;

/// ---------------------------------------------------------------------------
/// Outcomes
/// ---------------------------------------------------------------------------

/// Per-workout upload result. Batch operations continue past failures and
/// report them here instead of aborting.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
  pub workout_id: i64,
  pub external_id: Option<String>,
  pub scheduled: bool,
  pub scheduled_date: Option<NaiveDate>,
  pub error: Option<String>,
}

impl UploadOutcome {
  fn failure(workout_id: i64, error: String) -> Self {
    Self { workout_id, external_id: None, scheduled: false, scheduled_date: None, error: Some(error) }
  }
}

fn workout_name(workout: &PlannedWorkout) -> String {
  format!("Week {} - {}", workout.week_number, workout.workout_type)
}

/// ---------------------------------------------------------------------------
/// Upload
/// ---------------------------------------------------------------------------

async fn upload_one<E: ExecutionApi>(
  state: &AppState,
  api: &E,
  plan: &TrainingPlan,
  workout: &PlannedWorkout,
  schedule: bool,
) -> UploadOutcome {
  if workout.external_id.is_some() {
    return UploadOutcome::failure(workout.id, "Workout is already uploaded".to_string());
  }

  let steps = build_steps(workout, &plan.pace_zones);
  if steps.is_empty() {
    return UploadOutcome::failure(workout.id, "Workout has no executable steps".to_string());
  }

  let upload = WorkoutUpload { name: workout_name(workout), steps };
  let external_id = match api.upload_workout(&upload).await {
    Ok(id) => id,
    Err(e) => return UploadOutcome::failure(workout.id, e.to_string()),
  };

  if let Err(e) = store::mark_uploaded(&state.db, workout.id, &external_id).await {
    return UploadOutcome::failure(workout.id, format!("Uploaded but not recorded: {}", e));
  }

  let mut scheduled = false;
  let mut error = None;
  if schedule {
    match api.schedule_workout(&external_id, workout.scheduled_date).await {
      Ok(flag) => scheduled = flag,
      Err(e) => error = Some(format!("Uploaded but not scheduled: {}", e)),
    }
  }

  UploadOutcome {
    workout_id: workout.id,
    external_id: Some(external_id),
    scheduled,
    scheduled_date: scheduled.then_some(workout.scheduled_date),
    error,
  }
}

/// Upload a single workout to the execution service, optionally scheduling it
/// on its planned date.
pub async fn upload_workout<E: ExecutionApi>(
  state: &AppState,
  api: &E,
  workout_id: i64,
  schedule: bool,
) -> Result<UploadOutcome, String> {
  let workout = store::load_workout(&state.db, workout_id)
    .await
    .map_err(|e| format!("Failed to load workout: {}", e))?
    .ok_or_else(|| format!("Workout not found: {}", workout_id))?;

  let plan = store::load_plan(&state.db, &workout.plan_id, Some(workout.plan_version))
    .await
    .map_err(|e| format!("Failed to load plan: {}", e))?
    .ok_or_else(|| format!("Plan not found: {}", workout.plan_id))?;

  Ok(upload_one(state, api, &plan, &workout, schedule).await)
}

/// Upload every workout of a plan version (optionally one week). Individual
/// failures land in their outcome; the batch keeps going.
pub async fn upload_plan_workouts<E: ExecutionApi>(
  state: &AppState,
  api: &E,
  plan_id: &str,
  week_number: Option<u32>,
  schedule: bool,
) -> Result<Vec<UploadOutcome>, String> {
  let plan = store::load_plan(&state.db, plan_id, None)
    .await
    .map_err(|e| format!("Failed to load plan: {}", e))?
    .ok_or_else(|| format!("Plan not found: {}", plan_id))?;

  let mut outcomes = Vec::new();
  for workout in &plan.workouts {
    if week_number.is_some_and(|week| workout.week_number != week) {
      continue;
    }
    outcomes.push(upload_one(state, api, &plan, workout, schedule).await);
  }

  let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
  tracing::info!(plan_id, total = outcomes.len(), failed, "Uploaded plan workouts");
  Ok(outcomes)
}

/// ---------------------------------------------------------------------------
/// Delete
/// ---------------------------------------------------------------------------

/// Remove a workout from the execution service and clear its upload record.
/// A workout that was never uploaded is a no-op.
pub async fn delete_workout<E: ExecutionApi>(
  state: &AppState,
  api: &E,
  workout_id: i64,
) -> Result<(), String> {
  let workout = store::load_workout(&state.db, workout_id)
    .await
    .map_err(|e| format!("Failed to load workout: {}", e))?
    .ok_or_else(|| format!("Workout not found: {}", workout_id))?;

  let Some(external_id) = workout.external_id else {
    return Ok(());
  };

  api
    .delete_workout(&external_id)
    .await
    .map_err(|e| format!("Failed to delete workout: {}", e))?;
  store::clear_upload(&state.db, workout_id)
    .await
    .map_err(|e| format!("Deleted but not recorded: {}", e))
}

/// Delete every uploaded workout of a plan version (optionally one week).
/// Returns the number removed; individual failures are logged and skipped.
pub async fn delete_plan_workouts<E: ExecutionApi>(
  state: &AppState,
  api: &E,
  plan_id: &str,
  week_number: Option<u32>,
) -> Result<u32, String> {
  let plan = store::load_plan(&state.db, plan_id, None)
    .await
    .map_err(|e| format!("Failed to load plan: {}", e))?
    .ok_or_else(|| format!("Plan not found: {}", plan_id))?;

  let mut deleted = 0u32;
  for workout in &plan.workouts {
    if week_number.is_some_and(|week| workout.week_number != week) {
      continue;
    }
    let Some(external_id) = workout.external_id.as_deref() else {
      continue;
    };
    match api.delete_workout(external_id).await {
      Ok(()) => {
        if let Err(e) = store::clear_upload(&state.db, workout.id).await {
          tracing::warn!(workout_id = workout.id, error = %e, "Deleted but not recorded");
        }
        deleted += 1;
      }
      Err(e) => {
        tracing::warn!(workout_id = workout.id, error = %e, "Failed to delete workout");
      }
    }
  }

  Ok(deleted)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
