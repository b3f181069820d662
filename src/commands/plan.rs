use crate::db::AppState;
use crate::fitness::FitnessAssessor;
use crate::generator::{self, GeneratedPlan, PlanRequest};
use crate::models::plan::TrainingPlan;
use crate::safety::{validate_plan_safety, SafetyReport};
use crate::store;

/// ---------------------------------------------------------------------------
/// Plan Generation
/// ---------------------------------------------------------------------------

pub async fn generate_plan<A: FitnessAssessor>(
  state: &AppState,
  assessor: &A,
  request: PlanRequest,
) -> Result<GeneratedPlan, String> {
  generator::generate_plan(&state.db, assessor, request)
    .await
    .map_err(|e| format!("Failed to generate plan: {}", e))
}

/// Run the safety checks without generating or storing anything.
pub fn validate_plan(plan: &TrainingPlan) -> SafetyReport {
  validate_plan_safety(plan)
}

/// ---------------------------------------------------------------------------
/// Plan Retrieval
/// ---------------------------------------------------------------------------

/// Fetch a plan view: the active version by default, a single week when
/// `week_number` is set, and no workouts at all when `summary_only` is set.
pub async fn get_training_plan(
  state: &AppState,
  plan_id: &str,
  version: Option<i64>,
  week_number: Option<u32>,
  summary_only: bool,
) -> Result<Option<TrainingPlan>, String> {
  let plan = store::load_plan(&state.db, plan_id, version)
    .await
    .map_err(|e| format!("Failed to load plan: {}", e))?;

  let Some(mut plan) = plan else {
    return Ok(None);
  };

  if summary_only {
    plan.workouts.clear();
  } else if let Some(week) = week_number {
    plan.workouts.retain(|w| w.week_number == week);
  }
  Ok(Some(plan))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
