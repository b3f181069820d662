use std::collections::BTreeSet;

use chrono::Duration;
use serde::Serialize;

use crate::db::AppState;
use crate::matcher;
use crate::models::workout::{ActivityMatch, NewActivity};
use crate::store;

/// ---------------------------------------------------------------------------
/// Activity Intake
/// ---------------------------------------------------------------------------

/// Record a synced activity, deduplicating on its source id.
pub async fn record_activity(state: &AppState, activity: NewActivity) -> Result<i64, String> {
  store::upsert_activity(&state.db, &activity)
    .await
    .map_err(|e| format!("Failed to record activity: {}", e))
}

/// ---------------------------------------------------------------------------
/// Reconciliation
/// ---------------------------------------------------------------------------

/// Match synced activities against a plan version's workouts and persist the
/// pairings. Running this twice on unchanged data is a no-op: matched
/// workouts are skipped on the next pass.
pub async fn match_activities(
  state: &AppState,
  plan_id: &str,
  version: Option<i64>,
) -> Result<Vec<ActivityMatch>, String> {
  let plan = store::load_plan(&state.db, plan_id, version)
    .await
    .map_err(|e| format!("Failed to load plan: {}", e))?
    .ok_or_else(|| format!("Plan not found: {}", plan_id))?;

  if plan.workouts.is_empty() {
    return Ok(vec![]);
  }

  // One day of slack on each side of the plan's scheduled range.
  let first = plan.workouts.iter().map(|w| w.scheduled_date).min().unwrap_or(plan.start_date);
  let last = plan.workouts.iter().map(|w| w.scheduled_date).max().unwrap_or(plan.start_date);
  let activities =
    store::load_activities_between(&state.db, first - Duration::days(1), last + Duration::days(2))
      .await
      .map_err(|e| format!("Failed to load activities: {}", e))?;

  let matches = matcher::match_activities(&plan.workouts, &activities);

  for m in &matches {
    let completed_at = activities
      .iter()
      .find(|a| a.id == m.activity_id)
      .map(|a| a.started_at)
      .ok_or_else(|| format!("Matched activity {} disappeared", m.activity_id))?;
    store::record_match(&state.db, m.workout_id, m.activity_id, m.adherence_score, completed_at)
      .await
      .map_err(|e| format!("Failed to record match: {}", e))?;
  }

  tracing::info!(plan_id, matched = matches.len(), "Reconciled activities");
  Ok(matches)
}

/// ---------------------------------------------------------------------------
/// Week Completion
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WeekCompletion {
  /// Weeks with at least one matched workout.
  pub completed: BTreeSet<u32>,
  /// Highest completed week.
  pub latest: Option<u32>,
}

pub async fn get_completed_weeks(
  state: &AppState,
  plan_id: &str,
  version: Option<i64>,
) -> Result<WeekCompletion, String> {
  let plan = store::load_plan(&state.db, plan_id, version)
    .await
    .map_err(|e| format!("Failed to load plan: {}", e))?
    .ok_or_else(|| format!("Plan not found: {}", plan_id))?;

  let (completed, latest) = matcher::completed_weeks(&plan.workouts);
  Ok(WeekCompletion { completed, latest })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fitness::FixedAssessor;
  use crate::generator::{generate_plan, PlanRequest};
  use crate::models::plan::Goal;
  use crate::test_utils::setup_test_db;
  use chrono::NaiveTime;

  async fn seeded_state(plan_id: &str) -> AppState {
    let pool = setup_test_db().await;
    let request = PlanRequest {
      plan_id: Some(plan_id.to_string()),
      goal: Goal::Race10k,
      total_weeks: 8,
      target_race_date: None,
      target_time_seconds: None,
      runs_per_week: 4,
      start_runs_per_week: None,
      start_volume_km: Some(25.0),
      long_run_day: None,
      rest_days: vec![],
    };
    generate_plan(&pool, &FixedAssessor(48.0), request).await.unwrap();
    AppState { db: pool }
  }

  /// An activity landing exactly on the workout's planned date and distance.
  async fn activity_for(state: &AppState, plan_id: &str, week: u32, index: usize, source: &str) {
    let workout = store::load_workouts(&state.db, plan_id, 1, Some(week)).await.unwrap()[index].clone();
    let started_at = workout
      .scheduled_date
      .and_time(NaiveTime::from_hms_opt(7, 0, 0).unwrap())
      .and_utc();
    record_activity(
      state,
      NewActivity {
        source_id: source.to_string(),
        activity_type: "run".to_string(),
        started_at,
        duration_seconds: Some(3000),
        distance_meters: workout.distance_km.map(|km| km * 1000.0),
        average_heartrate: None,
      },
    )
    .await
    .unwrap();
  }

  #[tokio::test]
  async fn test_match_activities_persists_pairings() {
    let state = seeded_state("plan-m1").await;
    activity_for(&state, "plan-m1", 1, 0, "a-1").await;
    activity_for(&state, "plan-m1", 1, 1, "a-2").await;

    let matches = match_activities(&state, "plan-m1", None).await.unwrap();

    assert_eq!(matches.len(), 2);
    for m in &matches {
      assert!((m.adherence_score - 1.0).abs() < 1e-9);
      let stored = store::load_workout(&state.db, m.workout_id).await.unwrap().unwrap();
      assert_eq!(stored.matched_activity_id, Some(m.activity_id));
      assert!(stored.completed_at.is_some());
    }
  }

  #[tokio::test]
  async fn test_rerun_is_a_no_op() {
    let state = seeded_state("plan-m2").await;
    activity_for(&state, "plan-m2", 1, 0, "a-1").await;

    let first = match_activities(&state, "plan-m2", None).await.unwrap();
    let second = match_activities(&state, "plan-m2", None).await.unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
  }

  #[tokio::test]
  async fn test_completed_weeks_after_matching() {
    let state = seeded_state("plan-m3").await;
    activity_for(&state, "plan-m3", 1, 0, "a-0").await;
    activity_for(&state, "plan-m3", 2, 1, "a-1").await;
    match_activities(&state, "plan-m3", None).await.unwrap();

    let completion = get_completed_weeks(&state, "plan-m3", None).await.unwrap();

    assert!(completion.completed.contains(&1));
    assert!(completion.completed.contains(&2));
    assert_eq!(completion.latest, Some(2));
  }

  #[tokio::test]
  async fn test_match_missing_plan_errors() {
    let pool = setup_test_db().await;
    let state = AppState { db: pool };

    let err = match_activities(&state, "missing", None).await.unwrap_err();

    assert!(err.contains("not found"));
  }
}
