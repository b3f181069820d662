use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Workout Type: closed category, one per planned slot
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
  Easy,
  Recovery,
  Tempo,
  Threshold,
  Interval,
  Repetition,
  LongRun,
  RacePace,
  Rest,
}

impl WorkoutType {
  /// Quality sessions get a volume-scaled distance target.
  pub fn is_quality(&self) -> bool {
    matches!(
      self,
      WorkoutType::Tempo
        | WorkoutType::Threshold
        | WorkoutType::Interval
        | WorkoutType::Repetition
        | WorkoutType::RacePace
    )
  }

  /// Types that never appear in a return-to-run plan.
  pub fn prohibited_for_return_to_run(&self) -> bool {
    self.is_quality()
  }

  /// Types built as a repeated work/recovery block.
  pub fn is_interval_style(&self) -> bool {
    matches!(self, WorkoutType::Interval | WorkoutType::Repetition)
  }
}

impl std::fmt::Display for WorkoutType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      WorkoutType::Easy => "easy",
      WorkoutType::Recovery => "recovery",
      WorkoutType::Tempo => "tempo",
      WorkoutType::Threshold => "threshold",
      WorkoutType::Interval => "interval",
      WorkoutType::Repetition => "repetition",
      WorkoutType::LongRun => "long_run",
      WorkoutType::RacePace => "race_pace",
      WorkoutType::Rest => "rest",
    };
    write!(f, "{}", s)
  }
}

impl std::str::FromStr for WorkoutType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "easy" => Ok(WorkoutType::Easy),
      "recovery" => Ok(WorkoutType::Recovery),
      "tempo" => Ok(WorkoutType::Tempo),
      "threshold" => Ok(WorkoutType::Threshold),
      "interval" => Ok(WorkoutType::Interval),
      "repetition" => Ok(WorkoutType::Repetition),
      "long_run" => Ok(WorkoutType::LongRun),
      "race_pace" => Ok(WorkoutType::RacePace),
      "rest" => Ok(WorkoutType::Rest),
      _ => Err(format!("Unknown workout type: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Target Ranges
/// ---------------------------------------------------------------------------

/// Pace band in seconds per km. `low` is the slower bound (larger number),
/// `high` the faster bound.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaceRange {
  pub low_sec_per_km: f64,
  pub high_sec_per_km: f64,
}

impl PaceRange {
  /// Band around a single target pace: a few percent slower to a few faster.
  pub fn around(pace_sec_per_km: f64) -> Self {
    Self {
      low_sec_per_km: pace_sec_per_km * 1.03,
      high_sec_per_km: pace_sec_per_km * 0.97,
    }
  }
}

/// Heart-rate band in bpm, `low < high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrRange {
  pub low: u16,
  pub high: u16,
}

/// ---------------------------------------------------------------------------
/// Interval Structure
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMode {
  Jog,
  Walk,
  Standing,
}

/// Repeated work/recovery block for interval and repetition sessions.
/// Work is bounded by distance or duration; exactly one should be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalStructure {
  pub repetitions: u32,
  pub work_distance_km: Option<f64>,
  pub work_duration_seconds: Option<i64>,
  pub work_pace: Option<PaceRange>,
  pub recovery_seconds: i64,
  pub recovery_mode: RecoveryMode,
}

impl IntervalStructure {
  pub fn from_json(json: &str) -> Result<Self, String> {
    serde_json::from_str(json).map_err(|e| format!("Failed to parse interval structure: {}", e))
  }

  pub fn to_json(&self) -> String {
    serde_json::to_string(self).unwrap_or_default()
  }
}

/// ---------------------------------------------------------------------------
/// Planned Workout
/// ---------------------------------------------------------------------------

/// One scheduled session inside a (plan, version). Generation writes every
/// field except the reconciliation block at the bottom; upload and matching
/// mutate only that block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedWorkout {
  pub id: i64,
  pub plan_id: String,
  pub plan_version: i64,
  /// 1-based week within the plan.
  pub week_number: u32,
  /// 1-7 offset within the plan week (1 = the plan's start weekday).
  pub day_of_week: u32,
  pub workout_type: WorkoutType,
  pub phase: super::plan::PhaseKind,
  pub scheduled_date: NaiveDate,
  pub distance_km: Option<f64>,
  pub duration_seconds: Option<i64>,
  pub pace: Option<PaceRange>,
  pub hr: Option<HrRange>,
  pub interval: Option<IntervalStructure>,

  // Reconciliation fields, mutated after creation by upload and matching.
  pub external_id: Option<String>,
  pub uploaded_at: Option<DateTime<Utc>>,
  pub matched_activity_id: Option<i64>,
  pub adherence_score: Option<f64>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// ---------------------------------------------------------------------------
/// Completed Activity (synced from an external provider)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
  pub id: i64,
  pub source_id: String,
  pub activity_type: String,
  pub started_at: DateTime<Utc>,
  pub duration_seconds: Option<i64>,
  pub distance_meters: Option<f64>,
  pub average_heartrate: Option<i64>,
  pub created_at: Option<DateTime<Utc>>,
}

/// For inserting new activities (without id, created_at)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
  pub source_id: String,
  pub activity_type: String,
  pub started_at: DateTime<Utc>,
  pub duration_seconds: Option<i64>,
  pub distance_meters: Option<f64>,
  pub average_heartrate: Option<i64>,
}

/// ---------------------------------------------------------------------------
/// Activity Match (derived, not persisted as its own row)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityMatch {
  pub workout_id: i64,
  pub activity_id: i64,
  pub week_number: u32,
  /// Signed days between the activity date and the planned date.
  pub day_delta: i64,
  pub adherence_score: f64,
}
