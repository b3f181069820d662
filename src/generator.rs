//! Plan generator
//!
//! Orchestrates one generation pass: fitness snapshot -> capability scalar ->
//! phase sequence -> weekly volumes -> dated workouts -> safety validation ->
//! versioned save. Validation errors abort before anything is stored; a save
//! failure is logged and the computed plan is still returned, flagged as
//! unpersisted.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::capability;
use crate::error::PlanError;
use crate::fitness::{FitnessAssessor, FitnessSnapshot};
use crate::models::plan::{Goal, PlanStatus, TrainingPlan};
use crate::models::workout::PlannedWorkout;
use crate::periodization::{
  self, frequency_progression, phase_sequence_for, volume_progression,
};
use crate::safety::{validate_plan_safety, SafetyIssue};
use crate::store;
use crate::templates::{fill_slots, template_for, WeekContext};

/// Window the fitness assessor looks back over.
const LOOKBACK_WEEKS: u32 = 6;

/// Floor for the starting weekly volume (km).
const MIN_START_VOLUME_KM: f64 = 15.0;

const DEFAULT_LONG_RUN_DAY: u32 = 7;

/// ---------------------------------------------------------------------------
/// Request / Result
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
  /// Stable identifier across regenerations; a fresh one is minted if absent.
  pub plan_id: Option<String>,
  pub goal: Goal,
  pub total_weeks: u32,
  pub target_race_date: Option<NaiveDate>,
  pub target_time_seconds: Option<f64>,
  pub runs_per_week: u32,
  /// When set, run frequency ramps from here to `runs_per_week`.
  pub start_runs_per_week: Option<u32>,
  /// Overrides the assessed current weekly volume.
  pub start_volume_km: Option<f64>,
  /// 1-7 offset within the plan week; defaults to the last day.
  pub long_run_day: Option<u32>,
  /// 1-7 offsets to keep free of running.
  pub rest_days: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPlan {
  pub plan: TrainingPlan,
  pub warnings: Vec<SafetyIssue>,
  /// False when the plan could not be saved; the plan itself is still valid.
  pub persisted: bool,
}

/// ---------------------------------------------------------------------------
/// Start Date
/// ---------------------------------------------------------------------------

/// Race plans count back so the race lands on the final day of the final
/// week; open-ended plans start on the coming Monday.
fn start_date_for(
  race_date: Option<NaiveDate>,
  total_weeks: u32,
  today: NaiveDate,
) -> Result<NaiveDate, PlanError> {
  match race_date {
    Some(race) => {
      let start = race - Duration::days(i64::from(total_weeks) * 7 - 1);
      if start < today {
        return Err(PlanError::InvalidInput(format!(
          "Race on {} is too close for a {}-week plan",
          race, total_weeks
        )));
      }
      Ok(start)
    }
    None => {
      let offset = today.weekday().num_days_from_monday();
      let days_ahead = if offset == 0 { 0 } else { 7 - offset };
      Ok(today + Duration::days(i64::from(days_ahead)))
    }
  }
}

/// ---------------------------------------------------------------------------
/// Plan Construction
/// ---------------------------------------------------------------------------

fn validate_request(request: &PlanRequest) -> Result<(), PlanError> {
  let freq_range = periodization::MIN_FREQUENCY..=periodization::MAX_FREQUENCY;
  if !freq_range.contains(&request.runs_per_week) {
    return Err(PlanError::InvalidInput(format!(
      "Run frequency {} outside supported range {}-{}",
      request.runs_per_week,
      periodization::MIN_FREQUENCY,
      periodization::MAX_FREQUENCY
    )));
  }
  if let Some(start_freq) = request.start_runs_per_week {
    if !freq_range.contains(&start_freq) {
      return Err(PlanError::InvalidInput(format!(
        "Starting run frequency {} outside supported range",
        start_freq
      )));
    }
  }

  let long_run_day = request.long_run_day.unwrap_or(DEFAULT_LONG_RUN_DAY);
  if !(1..=7).contains(&long_run_day) {
    return Err(PlanError::InvalidInput(format!("Long run day {} outside 1-7", long_run_day)));
  }
  if request.rest_days.iter().any(|d| !(1..=7).contains(d)) {
    return Err(PlanError::InvalidInput("Rest days must be within 1-7".into()));
  }
  if request.rest_days.contains(&long_run_day) {
    return Err(PlanError::InvalidInput(format!(
      "Long run day {} cannot also be a rest day",
      long_run_day
    )));
  }
  Ok(())
}

/// Assemble a full plan from a fitness snapshot, without touching storage.
pub fn build_plan(
  request: &PlanRequest,
  fitness: &FitnessSnapshot,
  today: NaiveDate,
) -> Result<TrainingPlan, PlanError> {
  validate_request(request)?;

  // A target time implies a capability to train toward; never plan below
  // current fitness.
  let mut scalar = fitness.scalar;
  if let (Some(time), Some(distance)) =
    (request.target_time_seconds, request.goal.race_distance_km())
  {
    scalar = scalar.max(capability::capability_from_race(distance, time)?);
  }

  let estimate = capability::CapabilityEstimate::from_scalar(scalar, fitness.hr_zones)?;
  let phases = phase_sequence_for(request.goal, request.total_weeks)?;

  let start_volume_km = request
    .start_volume_km
    .or(fitness.weekly_volume_km)
    .unwrap_or(MIN_START_VOLUME_KM)
    .max(MIN_START_VOLUME_KM);
  let peak_volume_km = start_volume_km * request.goal.peak_multiplier();
  let weekly_volumes = volume_progression(start_volume_km, peak_volume_km, &phases);

  let frequency_by_week = request
    .start_runs_per_week
    .filter(|start| *start != request.runs_per_week)
    .map(|start| frequency_progression(start, request.runs_per_week, request.total_weeks))
    .transpose()?;

  let start_date = start_date_for(request.target_race_date, request.total_weeks, today)?;
  let long_run_day = request.long_run_day.unwrap_or(DEFAULT_LONG_RUN_DAY);

  let plan_id = request
    .plan_id
    .clone()
    .unwrap_or_else(|| Uuid::new_v4().to_string());

  let mut plan = TrainingPlan {
    plan_id,
    version: 1,
    status: PlanStatus::Active,
    goal: request.goal,
    target_race_date: request.target_race_date,
    target_time_seconds: request.target_time_seconds,
    capability: estimate.scalar,
    pace_zones: estimate.pace_zones,
    hr_zones: estimate.hr_zones,
    total_weeks: request.total_weeks,
    start_date,
    start_volume_km,
    peak_volume_km,
    runs_per_week: request.runs_per_week,
    frequency_by_week,
    phases,
    weekly_volumes,
    workouts: Vec::new(),
  };

  let mut workouts: Vec<PlannedWorkout> = Vec::new();
  let mut week_number = 0u32;
  for phase in &plan.phases {
    for _ in 0..phase.weeks {
      week_number += 1;
      let Some(&week_volume_km) = plan.weekly_volumes.get(week_number as usize - 1) else {
        break;
      };
      let frequency = plan
        .frequency_by_week
        .as_ref()
        .and_then(|f| f.get(week_number as usize - 1).copied())
        .unwrap_or(plan.runs_per_week);

      let slots = template_for(frequency, phase.kind, plan.goal)?;
      let ctx = WeekContext {
        plan_id: &plan.plan_id,
        plan_version: plan.version,
        week_number,
        phase: phase.kind,
        week_volume_km,
        pace_zones: &plan.pace_zones,
        hr_zones: plan.hr_zones.as_ref(),
        start_date: plan.start_date,
        long_run_day,
        rest_days: &request.rest_days,
      };
      workouts.extend(fill_slots(&slots, &ctx));
    }
  }

  plan.workouts = workouts;
  Ok(plan)
}

/// ---------------------------------------------------------------------------
/// Generation Entry Point
/// ---------------------------------------------------------------------------

/// Generate, validate, and save a plan. Safety errors abort before storage;
/// warnings ride along with the result.
pub async fn generate_plan<A: FitnessAssessor>(
  pool: &SqlitePool,
  assessor: &A,
  request: PlanRequest,
) -> Result<GeneratedPlan, PlanError> {
  let fitness = assessor.assess(LOOKBACK_WEEKS).await?;
  tracing::info!(
    goal = %request.goal,
    weeks = request.total_weeks,
    scalar = fitness.scalar,
    "Generating training plan"
  );

  let mut plan = build_plan(&request, &fitness, Utc::now().date_naive())?;

  let report = validate_plan_safety(&plan);
  if !report.is_safe() {
    let summary = report
      .errors
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join("; ");
    return Err(PlanError::InvalidInput(format!("Generated plan failed safety checks: {}", summary)));
  }

  let persisted = match store::save_plan(pool, &plan, &plan.workouts).await {
    Ok(version) => {
      plan.version = version;
      for workout in &mut plan.workouts {
        workout.plan_version = version;
      }
      true
    }
    Err(e) => {
      // Best-effort persistence: the computed plan is still returned.
      tracing::error!(plan_id = %plan.plan_id, error = %e, "Failed to save generated plan");
      false
    }
  };

  Ok(GeneratedPlan { plan, warnings: report.warnings, persisted })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
