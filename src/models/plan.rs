use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::capability::{HrZones, PaceZones};
use crate::models::workout::PlannedWorkout;

/// ---------------------------------------------------------------------------
/// Goal: what the plan is building toward
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
  Race5k,
  Race10k,
  HalfMarathon,
  Marathon,
  GeneralFitness,
  ReturnToRun,
}

impl Goal {
  /// Race distance in km, None for non-race goals.
  pub fn race_distance_km(&self) -> Option<f64> {
    match self {
      Goal::Race5k => Some(5.0),
      Goal::Race10k => Some(10.0),
      Goal::HalfMarathon => Some(21.0975),
      Goal::Marathon => Some(42.195),
      Goal::GeneralFitness | Goal::ReturnToRun => None,
    }
  }

  pub fn is_race(&self) -> bool {
    self.race_distance_km().is_some()
  }

  /// Minimum peak volume as a multiple of starting volume.
  pub fn peak_multiplier(&self) -> f64 {
    match self {
      Goal::Race5k | Goal::Race10k | Goal::HalfMarathon | Goal::Marathon => 1.5,
      Goal::GeneralFitness | Goal::ReturnToRun => 1.3,
    }
  }
}

impl std::fmt::Display for Goal {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Goal::Race5k => "race_5k",
      Goal::Race10k => "race_10k",
      Goal::HalfMarathon => "half_marathon",
      Goal::Marathon => "marathon",
      Goal::GeneralFitness => "general_fitness",
      Goal::ReturnToRun => "return_to_run",
    };
    write!(f, "{}", s)
  }
}

impl std::str::FromStr for Goal {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "race_5k" => Ok(Goal::Race5k),
      "race_10k" => Ok(Goal::Race10k),
      "half_marathon" => Ok(Goal::HalfMarathon),
      "marathon" => Ok(Goal::Marathon),
      "general_fitness" => Ok(Goal::GeneralFitness),
      "return_to_run" => Ok(Goal::ReturnToRun),
      _ => Err(format!("Unknown goal: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Phase: named macro-period with a week count
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
  Base,
  Build,
  Peak,
  Taper,
  Recovery,
}

impl std::fmt::Display for PhaseKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      PhaseKind::Base => "base",
      PhaseKind::Build => "build",
      PhaseKind::Peak => "peak",
      PhaseKind::Taper => "taper",
      PhaseKind::Recovery => "recovery",
    };
    write!(f, "{}", s)
  }
}

impl std::str::FromStr for PhaseKind {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "base" => Ok(PhaseKind::Base),
      "build" => Ok(PhaseKind::Build),
      "peak" => Ok(PhaseKind::Peak),
      "taper" => Ok(PhaseKind::Taper),
      "recovery" => Ok(PhaseKind::Recovery),
      _ => Err(format!("Unknown phase: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phase {
  pub kind: PhaseKind,
  pub weeks: u32,
}

impl Phase {
  pub fn new(kind: PhaseKind, weeks: u32) -> Self {
    Self { kind, weeks }
  }
}

/// ---------------------------------------------------------------------------
/// Plan Lifecycle
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PlanStatus {
  #[default]
  Active,
  Superseded,
}

impl std::fmt::Display for PlanStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PlanStatus::Active => write!(f, "active"),
      PlanStatus::Superseded => write!(f, "superseded"),
    }
  }
}

impl std::str::FromStr for PlanStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "active" => Ok(PlanStatus::Active),
      "superseded" => Ok(PlanStatus::Superseded),
      _ => Err(format!("Unknown plan status: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Training Plan
/// ---------------------------------------------------------------------------

/// A complete plan version. Regeneration for the same `plan_id` inserts a new
/// version and supersedes the old one; stored versions are never mutated, so
/// matched-activity history on an old version stays intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
  pub plan_id: String,
  pub version: i64,
  pub status: PlanStatus,
  pub goal: Goal,
  pub target_race_date: Option<NaiveDate>,
  pub target_time_seconds: Option<f64>,
  pub capability: f64,
  pub pace_zones: PaceZones,
  pub hr_zones: Option<HrZones>,
  pub total_weeks: u32,
  pub start_date: NaiveDate,
  pub start_volume_km: f64,
  pub peak_volume_km: f64,
  pub runs_per_week: u32,
  /// Per-week run frequency when a distinct start frequency was requested.
  /// Length equals `total_weeks` when present.
  pub frequency_by_week: Option<Vec<u32>>,
  /// Phase week counts sum to `total_weeks`.
  pub phases: Vec<Phase>,
  /// One volume per week, length equals `total_weeks`.
  pub weekly_volumes: Vec<f64>,
  pub workouts: Vec<PlannedWorkout>,
}

impl TrainingPlan {
  /// Inclusive first day and exclusive last day of a plan week.
  pub fn week_window(&self, week_number: u32) -> (NaiveDate, NaiveDate) {
    let start = self.start_date + Duration::days(i64::from(week_number - 1) * 7);
    (start, start + Duration::days(7))
  }

  /// Phase covering a given 1-based week, if the week is in range.
  pub fn phase_for_week(&self, week_number: u32) -> Option<PhaseKind> {
    let mut cursor = 0u32;
    for phase in &self.phases {
      cursor += phase.weeks;
      if week_number <= cursor {
        return Some(phase.kind);
      }
    }
    None
  }
}
