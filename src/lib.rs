//! Periodized endurance training plans.
//!
//! The crate turns a goal (a race, general fitness, or a return from layoff)
//! and an assessed capability into a versioned, week-by-week plan, converts
//! planned sessions into structured workout steps for an execution service,
//! and reconciles synced activities back against the plan.

pub mod capability;
pub mod commands;
pub mod db;
pub mod error;
pub mod exec;
pub mod fitness;
pub mod generator;
pub mod matcher;
pub mod models;
pub mod periodization;
pub mod safety;
pub mod steps;
pub mod store;
pub mod templates;

#[cfg(test)]
pub mod test_utils;

pub use db::{initialize_db, AppState, DbPool};
pub use error::PlanError;
pub use generator::{GeneratedPlan, PlanRequest};
pub use models::{
  Activity, ActivityMatch, Goal, NewActivity, PlannedWorkout, TrainingPlan, WorkoutType,
};
pub use safety::{SafetyIssue, SafetyReport};
