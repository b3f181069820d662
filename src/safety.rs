//! Plan safety validation
//!
//! Deterministic checks over a constructed plan, run before it is accepted
//! for storage. Findings are data, not exceptions: errors block acceptance,
//! warnings are informational and travel alongside a successful save.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::plan::{Goal, TrainingPlan};
use crate::models::workout::WorkoutType;

/// Week-over-week volume increase over this fraction is an error.
const VOLUME_JUMP_ERROR_PCT: f64 = 0.25;

/// Increases between this and the error bound are warnings.
const VOLUME_JUMP_WARNING_PCT: f64 = 0.15;

/// Threshold slack: a boundary-exact increase (e.g. the 25% rebound out of a
/// recovery phase) must land on the permissive side despite float noise.
const VOLUME_JUMP_EPS: f64 = 1e-9;

/// ---------------------------------------------------------------------------
/// Findings
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SafetyIssue {
  /// Weekly volume rises too fast.
  VolumeJump {
    week: u32,
    prior_km: f64,
    week_km: f64,
    increase_pct: f64,
  },
  /// A workout type the goal forbids.
  ProhibitedWorkout {
    week: u32,
    workout_type: WorkoutType,
  },
  /// A workout dated outside its declared week's 7-day window.
  DateOutsideWeek {
    week: u32,
    scheduled_date: NaiveDate,
  },
}

impl std::fmt::Display for SafetyIssue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SafetyIssue::VolumeJump { week, prior_km, week_km, increase_pct } => write!(
        f,
        "Week {} volume jumps {:.0}% ({:.1} km -> {:.1} km)",
        week,
        increase_pct * 100.0,
        prior_km,
        week_km
      ),
      SafetyIssue::ProhibitedWorkout { week, workout_type } => {
        write!(f, "Week {} contains prohibited workout type '{}'", week, workout_type)
      }
      SafetyIssue::DateOutsideWeek { week, scheduled_date } => {
        write!(f, "Workout dated {} falls outside week {}", scheduled_date, week)
      }
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyReport {
  pub errors: Vec<SafetyIssue>,
  pub warnings: Vec<SafetyIssue>,
}

impl SafetyReport {
  pub fn is_safe(&self) -> bool {
    self.errors.is_empty()
  }
}

/// ---------------------------------------------------------------------------
/// Validation
/// ---------------------------------------------------------------------------

/// Run all safety checks over a constructed plan.
pub fn validate_plan_safety(plan: &TrainingPlan) -> SafetyReport {
  let mut report = SafetyReport::default();

  check_volume_jumps(plan, &mut report);
  check_prohibited_workouts(plan, &mut report);
  check_workout_dates(plan, &mut report);

  report
}

fn check_volume_jumps(plan: &TrainingPlan, report: &mut SafetyReport) {
  // The baseline is the highest volume already reached, not the literal prior
  // week: a rebound after a planned reduced week is not an escalation.
  let mut baseline = 0.0f64;
  for (i, pair) in plan.weekly_volumes.windows(2).enumerate() {
    let (prior, current) = (pair[0], pair[1]);
    baseline = baseline.max(prior);
    if baseline <= 0.0 {
      continue;
    }
    let increase_pct = (current - baseline) / baseline;
    if increase_pct <= VOLUME_JUMP_WARNING_PCT + VOLUME_JUMP_EPS {
      continue;
    }

    let issue = SafetyIssue::VolumeJump {
      week: i as u32 + 2,
      prior_km: baseline,
      week_km: current,
      increase_pct,
    };
    if increase_pct > VOLUME_JUMP_ERROR_PCT + VOLUME_JUMP_EPS {
      report.errors.push(issue);
    } else {
      report.warnings.push(issue);
    }
  }
}

fn check_prohibited_workouts(plan: &TrainingPlan, report: &mut SafetyReport) {
  if plan.goal != Goal::ReturnToRun {
    return;
  }
  for workout in &plan.workouts {
    if workout.workout_type.prohibited_for_return_to_run() {
      report.errors.push(SafetyIssue::ProhibitedWorkout {
        week: workout.week_number,
        workout_type: workout.workout_type,
      });
    }
  }
}

fn check_workout_dates(plan: &TrainingPlan, report: &mut SafetyReport) {
  for workout in &plan.workouts {
    let (week_start, week_end) = plan.week_window(workout.week_number);
    if workout.scheduled_date < week_start || workout.scheduled_date >= week_end {
      report.errors.push(SafetyIssue::DateOutsideWeek {
        week: workout.week_number,
        scheduled_date: workout.scheduled_date,
      });
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
