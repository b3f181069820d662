//! Plan persistence
//!
//! Stored plan versions are append-only: regenerating a plan id inserts a new
//! version and flips the old one to superseded. Workout reconciliation fields
//! are the only thing updated in place.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::PlanError;
use crate::models::plan::{PlanStatus, TrainingPlan};
use crate::models::workout::{
  Activity, HrRange, IntervalStructure, NewActivity, PaceRange, PlannedWorkout,
};

/// ---------------------------------------------------------------------------
/// Plan Save (versioned)
/// ---------------------------------------------------------------------------

/// Insert a new version of the plan and its workouts, superseding any active
/// version with the same plan id. Returns the assigned version number.
pub async fn save_plan(
  pool: &SqlitePool,
  plan: &TrainingPlan,
  workouts: &[PlannedWorkout],
) -> Result<i64, PlanError> {
  let mut tx = pool.begin().await?;

  let prior: (i64,) =
    sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM training_plans WHERE plan_id = ?1")
      .bind(&plan.plan_id)
      .fetch_one(&mut *tx)
      .await?;
  let version = prior.0 + 1;

  sqlx::query("UPDATE training_plans SET status = 'superseded' WHERE plan_id = ?1 AND status = 'active'")
    .bind(&plan.plan_id)
    .execute(&mut *tx)
    .await?;

  let frequency_json = plan
    .frequency_by_week
    .as_ref()
    .map(serde_json::to_string)
    .transpose()?;
  let hr_zones_json = plan.hr_zones.as_ref().map(serde_json::to_string).transpose()?;

  sqlx::query(
    r#"
    INSERT INTO training_plans
      (plan_id, version, status, goal, target_race_date, target_time_seconds,
       capability, pace_zones_json, hr_zones_json, total_weeks, start_date,
       start_volume_km, peak_volume_km, runs_per_week, frequency_json,
       phases_json, volumes_json)
    VALUES (?, ?, 'active', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#,
  )
  .bind(&plan.plan_id)
  .bind(version)
  .bind(plan.goal.to_string())
  .bind(plan.target_race_date)
  .bind(plan.target_time_seconds)
  .bind(plan.capability)
  .bind(serde_json::to_string(&plan.pace_zones)?)
  .bind(hr_zones_json)
  .bind(plan.total_weeks as i64)
  .bind(plan.start_date)
  .bind(plan.start_volume_km)
  .bind(plan.peak_volume_km)
  .bind(plan.runs_per_week as i64)
  .bind(frequency_json)
  .bind(serde_json::to_string(&plan.phases)?)
  .bind(serde_json::to_string(&plan.weekly_volumes)?)
  .execute(&mut *tx)
  .await?;

  for workout in workouts {
    sqlx::query(
      r#"
      INSERT INTO planned_workouts
        (plan_id, plan_version, week_number, day_of_week, workout_type, phase,
         scheduled_date, distance_km, duration_seconds, pace_low_sec_per_km,
         pace_high_sec_per_km, hr_low, hr_high, interval_json)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
      "#,
    )
    .bind(&plan.plan_id)
    .bind(version)
    .bind(workout.week_number as i64)
    .bind(workout.day_of_week as i64)
    .bind(workout.workout_type.to_string())
    .bind(workout.phase.to_string())
    .bind(workout.scheduled_date)
    .bind(workout.distance_km)
    .bind(workout.duration_seconds)
    .bind(workout.pace.map(|p| p.low_sec_per_km))
    .bind(workout.pace.map(|p| p.high_sec_per_km))
    .bind(workout.hr.map(|h| h.low as i64))
    .bind(workout.hr.map(|h| h.high as i64))
    .bind(workout.interval.as_ref().map(|i| i.to_json()))
    .execute(&mut *tx)
    .await?;
  }

  tx.commit().await?;
  Ok(version)
}

/// ---------------------------------------------------------------------------
/// Plan Load
/// ---------------------------------------------------------------------------

fn row_to_plan(row: &SqliteRow) -> Result<TrainingPlan, PlanError> {
  let goal: String = row.get("goal");
  let status: String = row.get("status");
  let pace_zones_json: String = row.get("pace_zones_json");
  let hr_zones_json: Option<String> = row.get("hr_zones_json");
  let frequency_json: Option<String> = row.get("frequency_json");
  let phases_json: String = row.get("phases_json");
  let volumes_json: String = row.get("volumes_json");

  Ok(TrainingPlan {
    plan_id: row.get("plan_id"),
    version: row.get("version"),
    status: status.parse::<PlanStatus>().map_err(PlanError::InvalidInput)?,
    goal: goal.parse().map_err(PlanError::InvalidInput)?,
    target_race_date: row.get("target_race_date"),
    target_time_seconds: row.get("target_time_seconds"),
    capability: row.get("capability"),
    pace_zones: serde_json::from_str(&pace_zones_json)?,
    hr_zones: hr_zones_json.as_deref().map(serde_json::from_str).transpose()?,
    total_weeks: row.get::<i64, _>("total_weeks") as u32,
    start_date: row.get("start_date"),
    start_volume_km: row.get("start_volume_km"),
    peak_volume_km: row.get("peak_volume_km"),
    runs_per_week: row.get::<i64, _>("runs_per_week") as u32,
    frequency_by_week: frequency_json.as_deref().map(serde_json::from_str).transpose()?,
    phases: serde_json::from_str(&phases_json)?,
    weekly_volumes: serde_json::from_str(&volumes_json)?,
    workouts: Vec::new(),
  })
}

/// Load one plan version, `Ok(None)` when absent. A `None` version loads the
/// active version. Workouts are attached, ordered by week then day.
pub async fn load_plan(
  pool: &SqlitePool,
  plan_id: &str,
  version: Option<i64>,
) -> Result<Option<TrainingPlan>, PlanError> {
  let row = match version {
    Some(v) => {
      sqlx::query("SELECT * FROM training_plans WHERE plan_id = ?1 AND version = ?2")
        .bind(plan_id)
        .bind(v)
        .fetch_optional(pool)
        .await?
    }
    None => {
      sqlx::query(
        "SELECT * FROM training_plans WHERE plan_id = ?1 AND status = 'active'
         ORDER BY version DESC LIMIT 1",
      )
      .bind(plan_id)
      .fetch_optional(pool)
      .await?
    }
  };

  let Some(row) = row else {
    return Ok(None);
  };

  let mut plan = row_to_plan(&row)?;
  plan.workouts = load_workouts(pool, plan_id, plan.version, None).await?;
  Ok(Some(plan))
}

/// ---------------------------------------------------------------------------
/// Workout Load
/// ---------------------------------------------------------------------------

fn row_to_workout(row: &SqliteRow) -> Result<PlannedWorkout, PlanError> {
  let workout_type: String = row.get("workout_type");
  let phase: String = row.get("phase");
  let pace_low: Option<f64> = row.get("pace_low_sec_per_km");
  let pace_high: Option<f64> = row.get("pace_high_sec_per_km");
  let hr_low: Option<i64> = row.get("hr_low");
  let hr_high: Option<i64> = row.get("hr_high");
  let interval_json: Option<String> = row.get("interval_json");

  let pace = match (pace_low, pace_high) {
    (Some(low), Some(high)) => Some(PaceRange { low_sec_per_km: low, high_sec_per_km: high }),
    _ => None,
  };
  let hr = match (hr_low, hr_high) {
    (Some(low), Some(high)) => Some(HrRange { low: low as u16, high: high as u16 }),
    _ => None,
  };
  let interval = interval_json
    .as_deref()
    .map(IntervalStructure::from_json)
    .transpose()
    .map_err(PlanError::Serialization)?;

  Ok(PlannedWorkout {
    id: row.get("id"),
    plan_id: row.get("plan_id"),
    plan_version: row.get("plan_version"),
    week_number: row.get::<i64, _>("week_number") as u32,
    day_of_week: row.get::<i64, _>("day_of_week") as u32,
    workout_type: workout_type.parse().map_err(PlanError::InvalidInput)?,
    phase: phase.parse().map_err(PlanError::InvalidInput)?,
    scheduled_date: row.get("scheduled_date"),
    distance_km: row.get("distance_km"),
    duration_seconds: row.get("duration_seconds"),
    pace,
    hr,
    interval,
    external_id: row.get("external_id"),
    uploaded_at: row.get("uploaded_at"),
    matched_activity_id: row.get("matched_activity_id"),
    adherence_score: row.get("adherence_score"),
    completed_at: row.get("completed_at"),
  })
}

/// Workouts for one plan version, optionally narrowed to a single week.
pub async fn load_workouts(
  pool: &SqlitePool,
  plan_id: &str,
  version: i64,
  week_number: Option<u32>,
) -> Result<Vec<PlannedWorkout>, PlanError> {
  let rows = match week_number {
    Some(week) => {
      sqlx::query(
        "SELECT * FROM planned_workouts
         WHERE plan_id = ?1 AND plan_version = ?2 AND week_number = ?3
         ORDER BY week_number, day_of_week",
      )
      .bind(plan_id)
      .bind(version)
      .bind(week as i64)
      .fetch_all(pool)
      .await?
    }
    None => {
      sqlx::query(
        "SELECT * FROM planned_workouts
         WHERE plan_id = ?1 AND plan_version = ?2
         ORDER BY week_number, day_of_week",
      )
      .bind(plan_id)
      .bind(version)
      .fetch_all(pool)
      .await?
    }
  };

  rows.iter().map(row_to_workout).collect()
}

pub async fn load_workout(
  pool: &SqlitePool,
  workout_id: i64,
) -> Result<Option<PlannedWorkout>, PlanError> {
  let row = sqlx::query("SELECT * FROM planned_workouts WHERE id = ?1")
    .bind(workout_id)
    .fetch_optional(pool)
    .await?;

  row.as_ref().map(row_to_workout).transpose()
}

/// ---------------------------------------------------------------------------
/// Reconciliation Updates
/// ---------------------------------------------------------------------------

pub async fn mark_uploaded(
  pool: &SqlitePool,
  workout_id: i64,
  external_id: &str,
) -> Result<(), PlanError> {
  sqlx::query("UPDATE planned_workouts SET external_id = ?1, uploaded_at = ?2 WHERE id = ?3")
    .bind(external_id)
    .bind(Utc::now())
    .bind(workout_id)
    .execute(pool)
    .await?;
  Ok(())
}

pub async fn clear_upload(pool: &SqlitePool, workout_id: i64) -> Result<(), PlanError> {
  sqlx::query("UPDATE planned_workouts SET external_id = NULL, uploaded_at = NULL WHERE id = ?1")
    .bind(workout_id)
    .execute(pool)
    .await?;
  Ok(())
}

pub async fn record_match(
  pool: &SqlitePool,
  workout_id: i64,
  activity_id: i64,
  adherence_score: f64,
  completed_at: DateTime<Utc>,
) -> Result<(), PlanError> {
  sqlx::query(
    "UPDATE planned_workouts
     SET matched_activity_id = ?1, adherence_score = ?2, completed_at = ?3
     WHERE id = ?4",
  )
  .bind(activity_id)
  .bind(adherence_score)
  .bind(completed_at)
  .bind(workout_id)
  .execute(pool)
  .await?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Activities
/// ---------------------------------------------------------------------------

/// Insert or refresh a synced activity, keyed on its source id.
pub async fn upsert_activity(pool: &SqlitePool, activity: &NewActivity) -> Result<i64, PlanError> {
  sqlx::query(
    r#"
    INSERT INTO activities
      (source_id, activity_type, started_at, duration_seconds, distance_meters, average_heartrate)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT(source_id) DO UPDATE SET
      activity_type = excluded.activity_type,
      started_at = excluded.started_at,
      duration_seconds = excluded.duration_seconds,
      distance_meters = excluded.distance_meters,
      average_heartrate = excluded.average_heartrate
    "#,
  )
  .bind(&activity.source_id)
  .bind(&activity.activity_type)
  .bind(activity.started_at)
  .bind(activity.duration_seconds)
  .bind(activity.distance_meters)
  .bind(activity.average_heartrate)
  .execute(pool)
  .await?;

  let (id,): (i64,) = sqlx::query_as("SELECT id FROM activities WHERE source_id = ?1")
    .bind(&activity.source_id)
    .fetch_one(pool)
    .await?;
  Ok(id)
}

/// Activities whose start date falls in `[from, to)`. Timestamps are stored as
/// RFC 3339 text, so the date() comparison happens in SQLite.
pub async fn load_activities_between(
  pool: &SqlitePool,
  from: NaiveDate,
  to: NaiveDate,
) -> Result<Vec<Activity>, PlanError> {
  let activities = sqlx::query_as::<_, Activity>(
    "SELECT * FROM activities
     WHERE date(started_at) >= date(?1) AND date(started_at) < date(?2)
     ORDER BY started_at",
  )
  .bind(from)
  .bind(to)
  .fetch_all(pool)
  .await?;
  Ok(activities)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{make_test_plan, make_test_workout, setup_test_db};
  use crate::models::workout::WorkoutType;

  #[tokio::test]
  async fn test_save_and_load_round_trip() {
    let pool = setup_test_db().await;
    let plan = make_test_plan("plan-rt", 4);
    let workouts = vec![
      make_test_workout(&plan, 1, 2, WorkoutType::Easy),
      make_test_workout(&plan, 1, 7, WorkoutType::LongRun),
    ];

    let version = save_plan(&pool, &plan, &workouts).await.unwrap();
    let loaded = load_plan(&pool, "plan-rt", None).await.unwrap().unwrap();

    assert_eq!(version, 1);
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.status, PlanStatus::Active);
    assert_eq!(loaded.goal, plan.goal);
    assert_eq!(loaded.total_weeks, plan.total_weeks);
    assert_eq!(loaded.weekly_volumes, plan.weekly_volumes);
    assert_eq!(loaded.workouts.len(), 2);
    assert_eq!(loaded.workouts[0].workout_type, WorkoutType::Easy);
    assert_eq!(loaded.workouts[1].day_of_week, 7);
  }

  #[tokio::test]
  async fn test_resave_supersedes_previous_version() {
    let pool = setup_test_db().await;
    let plan = make_test_plan("plan-v", 4);

    save_plan(&pool, &plan, &[]).await.unwrap();
    let second = save_plan(&pool, &plan, &[]).await.unwrap();

    assert_eq!(second, 2);
    let active = load_plan(&pool, "plan-v", None).await.unwrap().unwrap();
    assert_eq!(active.version, 2);
    let old = load_plan(&pool, "plan-v", Some(1)).await.unwrap().unwrap();
    assert_eq!(old.status, PlanStatus::Superseded);
  }

  #[tokio::test]
  async fn test_load_missing_plan_is_none() {
    let pool = setup_test_db().await;

    assert!(load_plan(&pool, "nope", None).await.unwrap().is_none());
    assert!(load_workout(&pool, 42).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_mark_and_clear_upload() {
    let pool = setup_test_db().await;
    let plan = make_test_plan("plan-up", 4);
    let workouts = vec![make_test_workout(&plan, 1, 2, WorkoutType::Easy)];
    save_plan(&pool, &plan, &workouts).await.unwrap();
    let saved = load_workouts(&pool, "plan-up", 1, None).await.unwrap();

    mark_uploaded(&pool, saved[0].id, "ext-9").await.unwrap();
    let uploaded = load_workout(&pool, saved[0].id).await.unwrap().unwrap();
    assert_eq!(uploaded.external_id.as_deref(), Some("ext-9"));
    assert!(uploaded.uploaded_at.is_some());

    clear_upload(&pool, saved[0].id).await.unwrap();
    let cleared = load_workout(&pool, saved[0].id).await.unwrap().unwrap();
    assert!(cleared.external_id.is_none());
    assert!(cleared.uploaded_at.is_none());
  }

  #[tokio::test]
  async fn test_upsert_activity_dedupes_on_source_id() {
    let pool = setup_test_db().await;
    let mut activity = NewActivity {
      source_id: "src-1".to_string(),
      activity_type: "run".to_string(),
      started_at: Utc::now(),
      duration_seconds: Some(1800),
      distance_meters: Some(6000.0),
      average_heartrate: None,
    };

    let first = upsert_activity(&pool, &activity).await.unwrap();
    activity.distance_meters = Some(6200.0);
    let second = upsert_activity(&pool, &activity).await.unwrap();

    assert_eq!(first, second);
    let from = Utc::now().date_naive() - chrono::Duration::days(1);
    let to = Utc::now().date_naive() + chrono::Duration::days(1);
    let stored = load_activities_between(&pool, from, to).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].distance_meters, Some(6200.0));
  }

  #[tokio::test]
  async fn test_load_workouts_filters_by_week() {
    let pool = setup_test_db().await;
    let plan = make_test_plan("plan-wk", 4);
    let workouts = vec![
      make_test_workout(&plan, 1, 2, WorkoutType::Easy),
      make_test_workout(&plan, 2, 2, WorkoutType::Easy),
      make_test_workout(&plan, 2, 4, WorkoutType::Tempo),
    ];
    save_plan(&pool, &plan, &workouts).await.unwrap();

    let week_two = load_workouts(&pool, "plan-wk", 1, Some(2)).await.unwrap();

    assert_eq!(week_two.len(), 2);
    assert!(week_two.iter().all(|w| w.week_number == 2));
  }
}
