//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup
//! - Mock data factories

use chrono::{Duration, NaiveDate};
use sqlx::SqlitePool;

use crate::capability;
use crate::models::plan::{Goal, Phase, PhaseKind, PlanStatus, TrainingPlan};
use crate::models::workout::{PlannedWorkout, WorkoutType};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Insert a completed activity row and return its id.
/// `started_at` is an RFC 3339 timestamp.
pub async fn insert_test_activity(
  pool: &SqlitePool,
  activity_type: &str,
  started_at: &str,
  distance_meters: f64,
  duration_seconds: i64,
) -> i64 {
  let result = sqlx::query(
    r#"
    INSERT INTO activities (source_id, activity_type, started_at, duration_seconds, distance_meters)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
  )
  .bind(format!("test-{}-{}", started_at, distance_meters))
  .bind(activity_type)
  .bind(started_at)
  .bind(duration_seconds)
  .bind(distance_meters)
  .execute(pool)
  .await
  .expect("Failed to insert test activity");

  result.last_insert_rowid()
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A small general-fitness plan with sensible derived fields. Callers mutate
/// what they need; most tests only care about `plan_id` and `total_weeks`.
pub fn make_test_plan(plan_id: &str, weeks: u32) -> TrainingPlan {
  let pace_zones = capability::pace_zones(40.0).expect("valid test scalar");

  TrainingPlan {
    plan_id: plan_id.to_string(),
    version: 1,
    status: PlanStatus::Active,
    goal: Goal::GeneralFitness,
    target_race_date: None,
    target_time_seconds: None,
    capability: 40.0,
    pace_zones,
    hr_zones: None,
    total_weeks: weeks,
    start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
    start_volume_km: 20.0,
    peak_volume_km: 26.0,
    runs_per_week: 4,
    frequency_by_week: None,
    phases: vec![Phase::new(PhaseKind::Base, weeks)],
    weekly_volumes: (0..weeks).map(|w| 20.0 + f64::from(w)).collect(),
    workouts: Vec::new(),
  }
}

/// One planned session inside `plan`, dated from the plan's start.
pub fn make_test_workout(
  plan: &TrainingPlan,
  week_number: u32,
  day_of_week: u32,
  workout_type: WorkoutType,
) -> PlannedWorkout {
  let offset = i64::from(week_number - 1) * 7 + i64::from(day_of_week - 1);

  PlannedWorkout {
    id: 0,
    plan_id: plan.plan_id.clone(),
    plan_version: plan.version,
    week_number,
    day_of_week,
    workout_type,
    phase: plan.phase_for_week(week_number).unwrap_or(PhaseKind::Base),
    scheduled_date: plan.start_date + Duration::days(offset),
    distance_km: Some(8.0),
    duration_seconds: None,
    pace: Some(plan.pace_zones.easy_range()),
    hr: None,
    interval: None,
    external_id: None,
    uploaded_at: None,
    matched_activity_id: None,
    adherence_score: None,
    completed_at: None,
  }
}
