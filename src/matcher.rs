//! Activity matching
//!
//! Reconciles synced activities against planned workouts. Matching is pure:
//! callers load the candidates, this module pairs them up, and the command
//! layer persists the result.

use std::collections::BTreeSet;

use crate::models::workout::{Activity, ActivityMatch, PlannedWorkout, WorkoutType};

/// An activity may land the day before or after its planned slot.
const MAX_DAY_DELTA: i64 = 1;

/// ---------------------------------------------------------------------------
/// Adherence
/// ---------------------------------------------------------------------------

/// How closely the activity tracked the plan, in [0, 1]. Compares distance
/// when both sides have one, falls back to duration, and scores 1 when the
/// workout carried no comparable target.
pub fn adherence_score(workout: &PlannedWorkout, activity: &Activity) -> f64 {
  let ratio = |planned: f64, actual: f64| {
    if planned <= 0.0 {
      return 0.0;
    }
    (1.0 - (planned - actual).abs() / planned).clamp(0.0, 1.0)
  };

  if let (Some(planned_km), Some(actual_m)) = (workout.distance_km, activity.distance_meters) {
    return ratio(planned_km * 1000.0, actual_m);
  }
  if let (Some(planned_s), Some(actual_s)) = (workout.duration_seconds, activity.duration_seconds)
  {
    return ratio(planned_s as f64, actual_s as f64);
  }
  1.0
}

/// ---------------------------------------------------------------------------
/// Greedy Matching
/// ---------------------------------------------------------------------------

/// Pair run activities with unmatched workouts, at most one activity per
/// workout and one workout per activity. Workouts are considered in schedule
/// order; each takes its best remaining candidate - same-day first, then the
/// smaller day offset, then the earlier activity id.
pub fn match_activities(
  workouts: &[PlannedWorkout],
  activities: &[Activity],
) -> Vec<ActivityMatch> {
  // Activities already recorded against a workout stay off the table, so
  // re-running reconciliation never hands one to a second workout.
  let mut consumed: BTreeSet<i64> = workouts
    .iter()
    .filter_map(|w| w.matched_activity_id)
    .collect();
  let mut matches = Vec::new();

  let mut ordered: Vec<&PlannedWorkout> = workouts
    .iter()
    .filter(|w| w.workout_type != WorkoutType::Rest && w.matched_activity_id.is_none())
    .collect();
  ordered.sort_by_key(|w| (w.week_number, w.day_of_week));

  for workout in ordered {
    let mut best: Option<(i64, &Activity)> = None;

    for activity in activities {
      if activity.activity_type != "run" || consumed.contains(&activity.id) {
        continue;
      }
      let delta = (activity.started_at.date_naive() - workout.scheduled_date).num_days();
      if delta.abs() > MAX_DAY_DELTA {
        continue;
      }
      let better = match best {
        None => true,
        Some((best_delta, best_activity)) => {
          (delta.abs(), activity.id) < (best_delta.abs(), best_activity.id)
        }
      };
      if better {
        best = Some((delta, activity));
      }
    }

    if let Some((delta, activity)) = best {
      consumed.insert(activity.id);
      matches.push(ActivityMatch {
        workout_id: workout.id,
        activity_id: activity.id,
        week_number: workout.week_number,
        day_delta: delta,
        adherence_score: adherence_score(workout, activity),
      });
    }
  }

  matches
}

/// ---------------------------------------------------------------------------
/// Week Completion
/// ---------------------------------------------------------------------------

/// Weeks with at least one matched workout, plus the highest such week.
pub fn completed_weeks(workouts: &[PlannedWorkout]) -> (BTreeSet<u32>, Option<u32>) {
  let completed: BTreeSet<u32> = workouts
    .iter()
    .filter(|w| w.matched_activity_id.is_some())
    .map(|w| w.week_number)
    .collect();

  let latest = completed.last().copied();
  (completed, latest)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
