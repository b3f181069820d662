pub mod plan;
pub mod workout;

pub use plan::{Goal, Phase, PhaseKind, PlanStatus, TrainingPlan};
pub use workout::{
  Activity, ActivityMatch, HrRange, IntervalStructure, NewActivity, PaceRange, PlannedWorkout,
  RecoveryMode, WorkoutType,
};
