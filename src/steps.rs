//! Workout builder
//!
//! Translates one planned workout into the step/segment structure the
//! external workout-execution system expects. The output is a plain
//! serializable contract - no behavior, just the shape the upload client
//! sends over the wire.

use serde::{Deserialize, Serialize};

use crate::capability::PaceZones;
use crate::models::workout::{PaceRange, PlannedWorkout, WorkoutType};

/// Default warm-up / cool-down length for structured sessions.
const WARMUP_SECONDS: i64 = 600;
const COOLDOWN_SECONDS: i64 = 600;

/// ---------------------------------------------------------------------------
/// Step Contract Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
  WarmUp,
  Work,
  Recovery,
  CoolDown,
}

/// What ends a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndCondition {
  Distance { meters: f64 },
  Time { seconds: i64 },
  Open,
}

/// Speed band in m/s. Derived from a pace band as `1000 / pace`, so the slow
/// pace bound becomes the low speed bound. Callers must not swap these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedTarget {
  pub low_m_per_s: f64,
  pub high_m_per_s: f64,
}

impl SpeedTarget {
  pub fn from_pace(pace: &PaceRange) -> Self {
    Self {
      low_m_per_s: 1000.0 / pace.low_sec_per_km,
      high_m_per_s: 1000.0 / pace.high_sec_per_km,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDetail {
  pub kind: StepKind,
  pub end: EndCondition,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target: Option<SpeedTarget>,
}

/// One entry in the uploaded workout: a single step or a repeated group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionStep {
  Single(StepDetail),
  Repeat {
    repetitions: u32,
    steps: Vec<StepDetail>,
  },
}

/// ---------------------------------------------------------------------------
/// Builder
/// ---------------------------------------------------------------------------

fn single(kind: StepKind, end: EndCondition, target: Option<SpeedTarget>) -> ExecutionStep {
  ExecutionStep::Single(StepDetail { kind, end, target })
}

fn main_end_condition(workout: &PlannedWorkout) -> EndCondition {
  match (workout.distance_km, workout.duration_seconds) {
    (Some(km), _) => EndCondition::Distance { meters: km * 1000.0 },
    (None, Some(seconds)) => EndCondition::Time { seconds },
    (None, None) => EndCondition::Open,
  }
}

fn main_target(workout: &PlannedWorkout, zones: &PaceZones) -> SpeedTarget {
  let pace = workout.pace.unwrap_or_else(|| zones.easy_range());
  SpeedTarget::from_pace(&pace)
}

/// One distance-bounded step at the workout's pace band.
fn simple_steps(workout: &PlannedWorkout, zones: &PaceZones) -> Vec<ExecutionStep> {
  vec![single(
    StepKind::Work,
    main_end_condition(workout),
    Some(main_target(workout, zones)),
  )]
}

/// Warm-up, distance-bounded main segment, cool-down.
fn structured_steps(workout: &PlannedWorkout, zones: &PaceZones) -> Vec<ExecutionStep> {
  let easy = SpeedTarget::from_pace(&zones.easy_range());
  vec![
    single(StepKind::WarmUp, EndCondition::Time { seconds: WARMUP_SECONDS }, Some(easy)),
    single(
      StepKind::Work,
      main_end_condition(workout),
      Some(main_target(workout, zones)),
    ),
    single(StepKind::CoolDown, EndCondition::Time { seconds: COOLDOWN_SECONDS }, Some(easy)),
  ]
}

/// Warm-up, N x (work + timed recovery), cool-down.
fn interval_steps(workout: &PlannedWorkout, zones: &PaceZones) -> Vec<ExecutionStep> {
  // An interval-typed workout with no structure degrades to the simple form.
  let Some(structure) = workout.interval.as_ref() else {
    return simple_steps(workout, zones);
  };

  let easy = SpeedTarget::from_pace(&zones.easy_range());
  let work_end = match (structure.work_distance_km, structure.work_duration_seconds) {
    (Some(km), _) => EndCondition::Distance { meters: km * 1000.0 },
    (None, Some(seconds)) => EndCondition::Time { seconds },
    (None, None) => EndCondition::Open,
  };
  let work_target = structure
    .work_pace
    .as_ref()
    .or(workout.pace.as_ref())
    .map(SpeedTarget::from_pace);

  vec![
    single(StepKind::WarmUp, EndCondition::Time { seconds: WARMUP_SECONDS }, Some(easy)),
    ExecutionStep::Repeat {
      repetitions: structure.repetitions,
      steps: vec![
        StepDetail { kind: StepKind::Work, end: work_end, target: work_target },
        StepDetail {
          kind: StepKind::Recovery,
          end: EndCondition::Time { seconds: structure.recovery_seconds },
          target: None,
        },
      ],
    },
    single(StepKind::CoolDown, EndCondition::Time { seconds: COOLDOWN_SECONDS }, Some(easy)),
  ]
}

/// Ordered execution steps for one planned workout.
pub fn build_steps(workout: &PlannedWorkout, zones: &PaceZones) -> Vec<ExecutionStep> {
  match workout.workout_type {
    WorkoutType::Easy | WorkoutType::Recovery | WorkoutType::LongRun => {
      simple_steps(workout, zones)
    }
    WorkoutType::Tempo | WorkoutType::Threshold | WorkoutType::RacePace => {
      structured_steps(workout, zones)
    }
    WorkoutType::Interval | WorkoutType::Repetition => interval_steps(workout, zones),
    WorkoutType::Rest => vec![],
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::capability;
  use crate::models::plan::PhaseKind;
  use crate::models::workout::{IntervalStructure, RecoveryMode};
  use chrono::NaiveDate;

  fn zones() -> PaceZones {
    capability::pace_zones(50.0).unwrap()
  }

  fn make_workout(wt: WorkoutType) -> PlannedWorkout {
    PlannedWorkout {
      id: 1,
      plan_id: "plan-1".to_string(),
      plan_version: 1,
      week_number: 1,
      day_of_week: 2,
      workout_type: wt,
      phase: PhaseKind::Base,
      scheduled_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
      distance_km: Some(10.0),
      duration_seconds: None,
      pace: Some(PaceRange { low_sec_per_km: 360.0, high_sec_per_km: 320.0 }),
      hr: None,
      interval: None,
      external_id: None,
      uploaded_at: None,
      matched_activity_id: None,
      adherence_score: None,
      completed_at: None,
    }
  }

  #[test]
  fn test_speed_target_maps_slow_pace_to_low_speed() {
    let target = SpeedTarget::from_pace(&PaceRange {
      low_sec_per_km: 400.0,
      high_sec_per_km: 250.0,
    });
    assert!((target.low_m_per_s - 2.5).abs() < 1e-9);
    assert!((target.high_m_per_s - 4.0).abs() < 1e-9);
    assert!(target.low_m_per_s < target.high_m_per_s);
  }

  #[test]
  fn test_easy_run_is_single_distance_step() {
    let steps = build_steps(&make_workout(WorkoutType::Easy), &zones());
    assert_eq!(steps.len(), 1);
    match &steps[0] {
      ExecutionStep::Single(detail) => {
        assert_eq!(detail.kind, StepKind::Work);
        assert_eq!(detail.end, EndCondition::Distance { meters: 10_000.0 });
        assert!(detail.target.is_some());
      }
      other => panic!("Unexpected step: {:?}", other),
    }
  }

  #[test]
  fn test_tempo_has_warmup_main_cooldown() {
    let steps = build_steps(&make_workout(WorkoutType::Tempo), &zones());
    assert_eq!(steps.len(), 3);
    let kinds: Vec<StepKind> = steps
      .iter()
      .map(|s| match s {
        ExecutionStep::Single(d) => d.kind,
        ExecutionStep::Repeat { .. } => panic!("No repeat expected"),
      })
      .collect();
    assert_eq!(kinds, vec![StepKind::WarmUp, StepKind::Work, StepKind::CoolDown]);
  }

  #[test]
  fn test_interval_builds_repeat_block() {
    let mut workout = make_workout(WorkoutType::Interval);
    workout.interval = Some(IntervalStructure {
      repetitions: 5,
      work_distance_km: Some(1.0),
      work_duration_seconds: None,
      work_pace: Some(PaceRange { low_sec_per_km: 250.0, high_sec_per_km: 230.0 }),
      recovery_seconds: 120,
      recovery_mode: RecoveryMode::Jog,
    });

    let steps = build_steps(&workout, &zones());
    assert_eq!(steps.len(), 3);
    match &steps[1] {
      ExecutionStep::Repeat { repetitions, steps } => {
        assert_eq!(*repetitions, 5);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].kind, StepKind::Work);
        assert_eq!(steps[0].end, EndCondition::Distance { meters: 1000.0 });
        assert_eq!(steps[1].kind, StepKind::Recovery);
        assert_eq!(steps[1].end, EndCondition::Time { seconds: 120 });
        assert!(steps[1].target.is_none());
      }
      other => panic!("Unexpected step: {:?}", other),
    }
  }

  #[test]
  fn test_interval_without_structure_degrades_to_simple() {
    let workout = make_workout(WorkoutType::Interval);
    let steps = build_steps(&workout, &zones());
    assert_eq!(steps.len(), 1);
    assert!(matches!(&steps[0], ExecutionStep::Single(d) if d.kind == StepKind::Work));
  }

  #[test]
  fn test_rest_produces_no_steps() {
    let steps = build_steps(&make_workout(WorkoutType::Rest), &zones());
    assert!(steps.is_empty());
  }

  #[test]
  fn test_duration_only_workout_is_time_bounded() {
    let mut workout = make_workout(WorkoutType::Easy);
    workout.distance_km = None;
    workout.duration_seconds = Some(2700);
    let steps = build_steps(&workout, &zones());
    match &steps[0] {
      ExecutionStep::Single(d) => assert_eq!(d.end, EndCondition::Time { seconds: 2700 }),
      other => panic!("Unexpected step: {:?}", other),
    }
  }
}
