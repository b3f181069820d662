//! Weekly template engine
//!
//! Maps a (run frequency, phase, goal) triple to an ordered list of
//! workout-type slots for one week, then fills each slot with concrete
//! distance/pace/interval targets scaled by that week's volume. The long run
//! is always the final slot of a template.

use chrono::{Duration, NaiveDate};

use crate::capability::{HrZones, PaceZones};
use crate::error::PlanError;
use crate::models::plan::{Goal, PhaseKind};
use crate::models::workout::{
  HrRange, IntervalStructure, PaceRange, PlannedWorkout, RecoveryMode, WorkoutType,
};
use crate::periodization::{MAX_FREQUENCY, MIN_FREQUENCY};

/// ---------------------------------------------------------------------------
/// Slot Scaling Constants
/// ---------------------------------------------------------------------------

/// Long run share of the week's volume.
const LONG_RUN_PCT: f64 = 0.28;

/// Quality-session share of the week's volume.
const TEMPO_PCT: f64 = 0.15;
const THRESHOLD_PCT: f64 = 0.12;
const RACE_PACE_PCT: f64 = 0.12;

/// Minimum assigned distance for any non-rest run (km).
const MIN_RUN_KM: f64 = 3.0;

/// Default interval session: 5 x 1.0 km with a 2-minute jog recovery.
const INTERVAL_REPS: u32 = 5;
const INTERVAL_WORK_KM: f64 = 1.0;
const INTERVAL_RECOVERY_SECONDS: i64 = 120;

/// Default repetition session: 8 x 400 m with a 90-second jog recovery.
const REPETITION_REPS: u32 = 8;
const REPETITION_WORK_KM: f64 = 0.4;
const REPETITION_RECOVERY_SECONDS: i64 = 90;

/// ---------------------------------------------------------------------------
/// Template Lookup
/// ---------------------------------------------------------------------------

use WorkoutType::{Easy, Interval, LongRun, RacePace, Recovery, Tempo, Threshold};

fn standard_template(frequency: u32, phase: PhaseKind) -> Vec<WorkoutType> {
  match phase {
    PhaseKind::Base => match frequency {
      3 => vec![Easy, Tempo, LongRun],
      4 => vec![Easy, Tempo, Easy, LongRun],
      5 => vec![Easy, Tempo, Easy, Easy, LongRun],
      _ => vec![Easy, Tempo, Easy, Recovery, Easy, LongRun],
    },
    PhaseKind::Build => match frequency {
      3 => vec![Easy, Threshold, LongRun],
      4 => vec![Easy, Threshold, Easy, LongRun],
      5 => vec![Easy, Threshold, Interval, Easy, LongRun],
      _ => vec![Easy, Threshold, Interval, Recovery, Easy, LongRun],
    },
    PhaseKind::Peak => match frequency {
      3 => vec![Easy, Interval, LongRun],
      4 => vec![Easy, Interval, Easy, LongRun],
      5 => vec![Easy, Interval, Threshold, Easy, LongRun],
      _ => vec![Easy, Interval, Threshold, Recovery, Easy, LongRun],
    },
    PhaseKind::Taper => match frequency {
      3 => vec![Easy, RacePace, LongRun],
      4 => vec![Easy, RacePace, Easy, LongRun],
      5 => vec![Easy, RacePace, Easy, Easy, LongRun],
      _ => vec![Easy, RacePace, Easy, Recovery, Easy, LongRun],
    },
    PhaseKind::Recovery => match frequency {
      3 => vec![Easy, Easy, LongRun],
      4 => vec![Easy, Easy, Easy, LongRun],
      5 => vec![Easy, Easy, Easy, Easy, LongRun],
      _ => vec![Easy, Easy, Easy, Easy, Easy, LongRun],
    },
  }
}

fn return_to_run_template(frequency: u32, phase: PhaseKind) -> Vec<WorkoutType> {
  match phase {
    PhaseKind::Recovery => match frequency {
      3 => vec![Easy, Easy, LongRun],
      4 => vec![Easy, Easy, Easy, LongRun],
      5 => vec![Easy, Recovery, Easy, Easy, LongRun],
      _ => vec![Easy, Recovery, Easy, Recovery, Easy, LongRun],
    },
    PhaseKind::Base => match frequency {
      3 => vec![Recovery, Easy, LongRun],
      4 => vec![Recovery, Easy, Easy, LongRun],
      5 => vec![Recovery, Easy, Recovery, Easy, LongRun],
      _ => vec![Recovery, Easy, Recovery, Easy, Easy, LongRun],
    },
    // Peak and taper never occur for return-to-run; the build shape covers
    // every remaining arm without introducing quality work.
    PhaseKind::Build | PhaseKind::Peak | PhaseKind::Taper => match frequency {
      3 => vec![Easy, Easy, LongRun],
      4 => vec![Easy, Easy, Easy, LongRun],
      5 => vec![Easy, Recovery, Easy, Easy, LongRun],
      _ => vec![Easy, Recovery, Easy, Easy, Easy, LongRun],
    },
  }
}

/// Ordered workout-type slots for one week of a given phase and frequency.
pub fn template_for(
  frequency: u32,
  phase: PhaseKind,
  goal: Goal,
) -> Result<Vec<WorkoutType>, PlanError> {
  if !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&frequency) {
    return Err(PlanError::InvalidInput(format!(
      "Run frequency {} outside supported range {}-{}",
      frequency, MIN_FREQUENCY, MAX_FREQUENCY
    )));
  }

  let slots = match goal {
    Goal::ReturnToRun => return_to_run_template(frequency, phase),
    Goal::Race5k
    | Goal::Race10k
    | Goal::HalfMarathon
    | Goal::Marathon
    | Goal::GeneralFitness => standard_template(frequency, phase),
  };
  Ok(slots)
}

/// ---------------------------------------------------------------------------
/// Slot Filling
/// ---------------------------------------------------------------------------

/// Inputs shared by every slot of one week.
pub struct WeekContext<'a> {
  pub plan_id: &'a str,
  pub plan_version: i64,
  pub week_number: u32,
  pub phase: PhaseKind,
  pub week_volume_km: f64,
  pub pace_zones: &'a PaceZones,
  pub hr_zones: Option<&'a HrZones>,
  pub start_date: NaiveDate,
  /// 1-7 offset within the plan week.
  pub long_run_day: u32,
  /// 1-7 offsets to leave free.
  pub rest_days: &'a [u32],
}

fn quality_distance(slot: WorkoutType, volume: f64, long_run: f64) -> Option<f64> {
  let share = match slot {
    Tempo => TEMPO_PCT,
    Threshold => THRESHOLD_PCT,
    RacePace => RACE_PACE_PCT,
    Interval => return Some((f64::from(INTERVAL_REPS) * INTERVAL_WORK_KM).min(long_run)),
    WorkoutType::Repetition => {
      return Some((f64::from(REPETITION_REPS) * REPETITION_WORK_KM).min(long_run))
    }
    Easy | Recovery | LongRun | WorkoutType::Rest => return None,
  };
  Some((volume * share).max(MIN_RUN_KM).min(long_run))
}

fn pace_for(slot: WorkoutType, zones: &PaceZones) -> Option<PaceRange> {
  match slot {
    Easy | Recovery | LongRun => Some(zones.easy_range()),
    Tempo => Some(PaceRange::around(zones.marathon_sec_per_km)),
    Threshold | RacePace => Some(PaceRange::around(zones.threshold_sec_per_km)),
    Interval => Some(PaceRange::around(zones.interval_sec_per_km)),
    WorkoutType::Repetition => Some(PaceRange::around(zones.repetition_sec_per_km)),
    WorkoutType::Rest => None,
  }
}

fn hr_for(slot: WorkoutType, zones: Option<&HrZones>) -> Option<HrRange> {
  let zones = zones?;
  match slot {
    Easy | Recovery | LongRun => Some(zones.easy),
    Tempo => Some(zones.marathon),
    Threshold | RacePace => Some(zones.threshold),
    Interval | WorkoutType::Repetition => Some(zones.interval),
    WorkoutType::Rest => None,
  }
}

fn interval_structure_for(slot: WorkoutType, zones: &PaceZones) -> Option<IntervalStructure> {
  match slot {
    Interval => Some(IntervalStructure {
      repetitions: INTERVAL_REPS,
      work_distance_km: Some(INTERVAL_WORK_KM),
      work_duration_seconds: None,
      work_pace: Some(PaceRange::around(zones.interval_sec_per_km)),
      recovery_seconds: INTERVAL_RECOVERY_SECONDS,
      recovery_mode: RecoveryMode::Jog,
    }),
    WorkoutType::Repetition => Some(IntervalStructure {
      repetitions: REPETITION_REPS,
      work_distance_km: Some(REPETITION_WORK_KM),
      work_duration_seconds: None,
      work_pace: Some(PaceRange::around(zones.repetition_sec_per_km)),
      recovery_seconds: REPETITION_RECOVERY_SECONDS,
      recovery_mode: RecoveryMode::Jog,
    }),
    Easy | Recovery | Tempo | Threshold | LongRun | RacePace | WorkoutType::Rest => None,
  }
}

/// Spread `count` slots across the week's non-rest days, long-run day
/// excluded. Falls back to rest days only when the week has no other room.
fn assign_days(count: usize, long_run_day: u32, rest_days: &[u32]) -> Vec<u32> {
  let mut candidates: Vec<u32> = (1..=7)
    .filter(|d| *d != long_run_day && !rest_days.contains(d))
    .collect();
  if candidates.len() < count {
    let mut overflow: Vec<u32> = (1..=7)
      .filter(|d| *d != long_run_day && rest_days.contains(d))
      .collect();
    candidates.append(&mut overflow);
    candidates.sort_unstable();
  }

  let n = candidates.len();
  (0..count).map(|i| candidates[(i * n) / count]).collect()
}

/// Fill a week's slots with dated, targeted workouts (long run last in
/// `slots`, per `template_for`).
pub fn fill_slots(slots: &[WorkoutType], ctx: &WeekContext<'_>) -> Vec<PlannedWorkout> {
  let volume = ctx.week_volume_km;
  let long_run_km = (volume * LONG_RUN_PCT).max(MIN_RUN_KM);

  // Easy-run share: whatever the long run and quality slots leave over.
  let quality_total: f64 = slots
    .iter()
    .filter_map(|s| quality_distance(*s, volume, long_run_km))
    .sum();
  let easy_count = slots
    .iter()
    .filter(|s| matches!(s, Easy | Recovery))
    .count();
  let easy_km = if easy_count > 0 {
    ((volume - long_run_km - quality_total) / easy_count as f64).max(MIN_RUN_KM)
  } else {
    MIN_RUN_KM
  };

  let other_days = assign_days(slots.len().saturating_sub(1), ctx.long_run_day, ctx.rest_days);
  let mut day_iter = other_days.into_iter();

  let mut workouts: Vec<PlannedWorkout> = slots
    .iter()
    .map(|&slot| {
      let day = if slot == LongRun {
        ctx.long_run_day
      } else {
        day_iter.next().unwrap_or(ctx.long_run_day)
      };
      let date = ctx.start_date
        + Duration::days(i64::from(ctx.week_number - 1) * 7 + i64::from(day - 1));

      let distance_km = match slot {
        LongRun => Some(long_run_km),
        Easy | Recovery => Some(easy_km),
        Tempo | Threshold | Interval | WorkoutType::Repetition | RacePace => {
          quality_distance(slot, volume, long_run_km)
        }
        WorkoutType::Rest => None,
      };

      PlannedWorkout {
        id: 0,
        plan_id: ctx.plan_id.to_string(),
        plan_version: ctx.plan_version,
        week_number: ctx.week_number,
        day_of_week: day,
        workout_type: slot,
        phase: ctx.phase,
        scheduled_date: date,
        distance_km,
        duration_seconds: None,
        pace: pace_for(slot, ctx.pace_zones),
        hr: hr_for(slot, ctx.hr_zones),
        interval: interval_structure_for(slot, ctx.pace_zones),
        external_id: None,
        uploaded_at: None,
        matched_activity_id: None,
        adherence_score: None,
        completed_at: None,
      }
    })
    .collect();

  workouts.sort_by_key(|w| w.day_of_week);
  workouts
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::capability;

  fn zones() -> PaceZones {
    capability::pace_zones(50.0).unwrap()
  }

  fn ctx<'a>(zones: &'a PaceZones, rest_days: &'a [u32]) -> WeekContext<'a> {
    WeekContext {
      plan_id: "plan-1",
      plan_version: 1,
      week_number: 2,
      phase: PhaseKind::Build,
      week_volume_km: 40.0,
      pace_zones: zones,
      hr_zones: None,
      start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
      long_run_day: 7,
      rest_days,
    }
  }

  #[test]
  fn test_template_rejects_out_of_range_frequency() {
    assert!(template_for(2, PhaseKind::Base, Goal::Race10k).is_err());
    assert!(template_for(7, PhaseKind::Base, Goal::Race10k).is_err());
  }

  #[test]
  fn test_long_run_always_last() {
    for freq in MIN_FREQUENCY..=MAX_FREQUENCY {
      for phase in [
        PhaseKind::Base,
        PhaseKind::Build,
        PhaseKind::Peak,
        PhaseKind::Taper,
        PhaseKind::Recovery,
      ] {
        for goal in [Goal::Race10k, Goal::GeneralFitness, Goal::ReturnToRun] {
          let slots = template_for(freq, phase, goal).unwrap();
          assert_eq!(slots.len() as u32, freq);
          assert_eq!(*slots.last().unwrap(), WorkoutType::LongRun);
        }
      }
    }
  }

  #[test]
  fn test_build_at_five_runs_includes_interval() {
    let slots = template_for(5, PhaseKind::Build, Goal::Race10k).unwrap();
    assert!(slots.contains(&WorkoutType::Threshold));
    assert!(slots.contains(&WorkoutType::Interval));

    let slots = template_for(4, PhaseKind::Build, Goal::Race10k).unwrap();
    assert!(!slots.contains(&WorkoutType::Interval));
  }

  #[test]
  fn test_recovery_phase_is_easy_only() {
    for freq in MIN_FREQUENCY..=MAX_FREQUENCY {
      let slots = template_for(freq, PhaseKind::Recovery, Goal::Race10k).unwrap();
      assert!(slots
        .iter()
        .all(|s| matches!(s, WorkoutType::Easy | WorkoutType::LongRun)));
    }
  }

  #[test]
  fn test_return_to_run_never_gets_quality() {
    for freq in MIN_FREQUENCY..=MAX_FREQUENCY {
      for phase in [
        PhaseKind::Recovery,
        PhaseKind::Base,
        PhaseKind::Build,
        PhaseKind::Peak,
        PhaseKind::Taper,
      ] {
        let slots = template_for(freq, phase, Goal::ReturnToRun).unwrap();
        assert!(
          slots.iter().all(|s| !s.prohibited_for_return_to_run()),
          "{:?} at {} runs contains quality work",
          phase,
          freq
        );
      }
    }
  }

  #[test]
  fn test_fill_slots_long_run_share_and_floor() {
    let zones = zones();
    let context = ctx(&zones, &[]);
    let slots = template_for(4, PhaseKind::Build, Goal::Race10k).unwrap();
    let workouts = fill_slots(&slots, &context);

    let long_run = workouts
      .iter()
      .find(|w| w.workout_type == WorkoutType::LongRun)
      .unwrap();
    assert!((long_run.distance_km.unwrap() - 40.0 * LONG_RUN_PCT).abs() < 1e-9);

    // Very low volume still floors every run at 3 km.
    let low = WeekContext { week_volume_km: 6.0, ..ctx(&zones, &[]) };
    let workouts = fill_slots(&slots, &low);
    for w in &workouts {
      assert!(w.distance_km.unwrap() >= MIN_RUN_KM);
    }
  }

  #[test]
  fn test_quality_never_exceeds_long_run() {
    let zones = zones();
    let context = ctx(&zones, &[]);
    let slots = template_for(5, PhaseKind::Build, Goal::Race10k).unwrap();
    let workouts = fill_slots(&slots, &context);

    let long_km = workouts
      .iter()
      .find(|w| w.workout_type == WorkoutType::LongRun)
      .and_then(|w| w.distance_km)
      .unwrap();
    for w in workouts.iter().filter(|w| w.workout_type.is_quality()) {
      assert!(w.distance_km.unwrap() <= long_km + 1e-9);
    }
  }

  #[test]
  fn test_fill_slots_respects_long_run_day_and_rest_days() {
    let zones = zones();
    let rest = [3u32];
    let context = ctx(&zones, &rest);
    let slots = template_for(5, PhaseKind::Build, Goal::Race10k).unwrap();
    let workouts = fill_slots(&slots, &context);

    let long_run = workouts
      .iter()
      .find(|w| w.workout_type == WorkoutType::LongRun)
      .unwrap();
    assert_eq!(long_run.day_of_week, 7);
    assert!(workouts.iter().all(|w| w.day_of_week != 3));

    // No two workouts share a day at these frequencies.
    let mut days: Vec<u32> = workouts.iter().map(|w| w.day_of_week).collect();
    days.dedup();
    assert_eq!(days.len(), workouts.len());
  }

  #[test]
  fn test_fill_slots_dates_fall_in_week_window() {
    let zones = zones();
    let context = ctx(&zones, &[]);
    let slots = template_for(6, PhaseKind::Build, Goal::Race10k).unwrap();
    let workouts = fill_slots(&slots, &context);

    let week_start = context.start_date + Duration::days(7);
    let week_end = week_start + Duration::days(7);
    for w in &workouts {
      assert!(w.scheduled_date >= week_start && w.scheduled_date < week_end);
    }
  }

  #[test]
  fn test_interval_slot_gets_default_structure() {
    let zones = zones();
    let context = ctx(&zones, &[]);
    let slots = template_for(5, PhaseKind::Build, Goal::Race10k).unwrap();
    let workouts = fill_slots(&slots, &context);

    let interval = workouts
      .iter()
      .find(|w| w.workout_type == WorkoutType::Interval)
      .unwrap();
    let structure = interval.interval.as_ref().unwrap();
    assert_eq!(structure.repetitions, INTERVAL_REPS);
    assert_eq!(structure.work_distance_km, Some(INTERVAL_WORK_KM));
    assert_eq!(structure.recovery_seconds, INTERVAL_RECOVERY_SECONDS);
  }
}
