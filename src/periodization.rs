//! Periodization engine
//!
//! Lays out the macro-period phase sequence for a goal and derives the
//! per-week volume and run-frequency progressions under safety constraints:
//! - phase week counts always sum to the plan's total weeks
//! - base/build volume never jumps more than 10% of the starting volume
//! - every 4th cumulative base/build week is a reduced recovery week
//!
//! Pure scheduling math, no I/O.

use crate::error::PlanError;
use crate::models::plan::{Goal, Phase, PhaseKind};

/// ---------------------------------------------------------------------------
/// Progression Constants
/// ---------------------------------------------------------------------------

/// Max week-over-week volume increase, as a fraction of the starting volume.
const MAX_WEEKLY_INCREASE_PCT: f64 = 0.10;

/// Every Nth cumulative base/build week is a reduced week.
const RECOVERY_WEEK_CADENCE: u32 = 4;

/// Reduced weeks (periodic and recovery-phase) run at this fraction.
const RECOVERY_WEEK_PCT: f64 = 0.80;

/// Taper finishes at this fraction of peak volume.
const TAPER_FLOOR_PCT: f64 = 0.50;

/// Supported run-frequency range (runs per week).
pub const MIN_FREQUENCY: u32 = 3;
pub const MAX_FREQUENCY: u32 = 6;

/// Return-to-run plans at or below this length get no build phase.
const RETURN_TO_RUN_SHORT_WEEKS: u32 = 6;

/// ---------------------------------------------------------------------------
/// Phase Sequences
/// ---------------------------------------------------------------------------

/// Percentage split (base, build, peak, taper) for a race goal.
fn race_split(goal: Goal) -> Result<(f64, f64, f64, f64), PlanError> {
  match goal {
    Goal::Race5k | Goal::Race10k => Ok((0.40, 0.30, 0.18, 0.12)),
    Goal::HalfMarathon => Ok((0.40, 0.30, 0.20, 0.10)),
    Goal::Marathon => Ok((0.45, 0.30, 0.15, 0.10)),
    Goal::GeneralFitness | Goal::ReturnToRun => Err(PlanError::InvalidInput(format!(
      "{} is not a race goal",
      goal
    ))),
  }
}

/// Base/build/peak/taper sequence for a race goal. Each phase gets at least
/// one week; rounding drift is reconciled against the base phase so the sum
/// is exactly `total_weeks`.
pub fn race_phase_sequence(total_weeks: u32, goal: Goal) -> Result<Vec<Phase>, PlanError> {
  if total_weeks < 4 {
    return Err(PlanError::InvalidInput(format!(
      "Race plans need at least 4 weeks, got {}",
      total_weeks
    )));
  }

  let (_, build_pct, peak_pct, taper_pct) = race_split(goal)?;
  let total = f64::from(total_weeks);

  let build = ((total * build_pct).round() as u32).max(1);
  let peak = ((total * peak_pct).round() as u32).max(1);
  let taper = ((total * taper_pct).round() as u32).max(1);
  let base = total_weeks.saturating_sub(build + peak + taper).max(1);

  Ok(vec![
    Phase::new(PhaseKind::Base, base),
    Phase::new(PhaseKind::Build, build),
    Phase::new(PhaseKind::Peak, peak),
    Phase::new(PhaseKind::Taper, taper),
  ])
}

/// Repeating 4-week mesocycles (3 build + 1 recovery) for general fitness.
/// A trailing remainder of 1-3 weeks becomes a final partial build phase, so
/// a plan never ends on a short recovery week.
pub fn fitness_phase_sequence(total_weeks: u32) -> Result<Vec<Phase>, PlanError> {
  if total_weeks == 0 {
    return Err(PlanError::InvalidInput("Plan must be at least 1 week".into()));
  }

  let mut phases = Vec::new();
  let mut remaining = total_weeks;
  while remaining >= 4 {
    phases.push(Phase::new(PhaseKind::Build, 3));
    phases.push(Phase::new(PhaseKind::Recovery, 1));
    remaining -= 4;
  }
  if remaining > 0 {
    phases.push(Phase::new(PhaseKind::Build, remaining));
  }

  Ok(phases)
}

/// Return-to-run sequences always open with a recovery phase and never
/// contain peak or taper phases. Short plans are recovery + base only.
pub fn return_to_run_phase_sequence(total_weeks: u32) -> Result<Vec<Phase>, PlanError> {
  if total_weeks < 2 {
    return Err(PlanError::InvalidInput(
      "Return-to-run plans need at least 2 weeks".into(),
    ));
  }

  let recovery = 2.min(total_weeks - 1);
  let remaining = total_weeks - recovery;

  if total_weeks <= RETURN_TO_RUN_SHORT_WEEKS {
    return Ok(vec![
      Phase::new(PhaseKind::Recovery, recovery),
      Phase::new(PhaseKind::Base, remaining),
    ]);
  }

  let build = remaining / 2;
  let base = remaining - build;
  Ok(vec![
    Phase::new(PhaseKind::Recovery, recovery),
    Phase::new(PhaseKind::Base, base),
    Phase::new(PhaseKind::Build, build),
  ])
}

/// Select the phase-sequence constructor for a goal.
pub fn phase_sequence_for(goal: Goal, total_weeks: u32) -> Result<Vec<Phase>, PlanError> {
  match goal {
    Goal::Race5k | Goal::Race10k | Goal::HalfMarathon | Goal::Marathon => {
      race_phase_sequence(total_weeks, goal)
    }
    Goal::GeneralFitness => fitness_phase_sequence(total_weeks),
    Goal::ReturnToRun => return_to_run_phase_sequence(total_weeks),
  }
}

/// ---------------------------------------------------------------------------
/// Volume Progression
/// ---------------------------------------------------------------------------

/// Per-week volume sequence across a phase sequence. Output length always
/// equals the sum of phase week counts.
pub fn volume_progression(start_volume: f64, peak_volume: f64, phases: &[Phase]) -> Vec<f64> {
  let total_build_weeks: u32 = phases
    .iter()
    .filter(|p| matches!(p.kind, PhaseKind::Base | PhaseKind::Build))
    .map(|p| p.weeks)
    .sum();
  // Every 4th cumulative base/build week is a reduced week and does not
  // consume convergence budget.
  let effective_total = total_build_weeks - total_build_weeks / RECOVERY_WEEK_CADENCE;
  let max_step = start_volume * MAX_WEEKLY_INCREASE_PCT;

  let mut volumes: Vec<f64> = Vec::new();
  let mut current = start_volume;
  let mut build_weeks_seen = 0u32;
  let mut effective_seen = 0u32;

  for phase in phases {
    match phase.kind {
      PhaseKind::Base | PhaseKind::Build => {
        for _ in 0..phase.weeks {
          build_weeks_seen += 1;
          if build_weeks_seen % RECOVERY_WEEK_CADENCE == 0 {
            // Reduced week: 80% of the would-be volume, progression resumes
            // from `current` afterwards.
            volumes.push(current * RECOVERY_WEEK_PCT);
            continue;
          }
          effective_seen += 1;
          if effective_seen > 1 {
            let remaining = effective_total - effective_seen + 1;
            let step = ((peak_volume - current) / f64::from(remaining)).clamp(0.0, max_step);
            current += step;
          }
          volumes.push(current);
        }
      }
      PhaseKind::Peak => {
        current = peak_volume;
        for _ in 0..phase.weeks {
          volumes.push(peak_volume);
        }
      }
      PhaseKind::Taper => {
        let from = volumes.last().copied().unwrap_or(start_volume);
        let floor = peak_volume * TAPER_FLOOR_PCT;
        for week in 1..=phase.weeks {
          let t = f64::from(week) / f64::from(phase.weeks);
          volumes.push(from + (floor - from) * t);
        }
        current = floor;
      }
      PhaseKind::Recovery => {
        for _ in 0..phase.weeks {
          let prior = volumes.last().copied().unwrap_or(start_volume);
          volumes.push(prior * RECOVERY_WEEK_PCT);
        }
        // Progression after a recovery phase resumes from where it left off.
      }
    }
  }

  volumes
}

/// ---------------------------------------------------------------------------
/// Frequency Progression
/// ---------------------------------------------------------------------------

/// Linear interpolation from `start_freq` to `target_freq` inclusive, one
/// value per week, clamped to the supported range.
pub fn frequency_progression(
  start_freq: u32,
  target_freq: u32,
  total_weeks: u32,
) -> Result<Vec<u32>, PlanError> {
  if total_weeks == 0 {
    return Err(PlanError::InvalidInput("Plan must be at least 1 week".into()));
  }

  let clamp = |f: u32| f.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
  if total_weeks == 1 {
    return Ok(vec![clamp(start_freq)]);
  }

  let start = f64::from(start_freq);
  let span = f64::from(target_freq) - start;
  let steps = f64::from(total_weeks - 1);

  Ok(
    (0..total_weeks)
      .map(|week| {
        let value = start + span * f64::from(week) / steps;
        clamp(value.round() as u32)
      })
      .collect(),
  )
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  fn total(phases: &[Phase]) -> u32 {
    phases.iter().map(|p| p.weeks).sum()
  }

  #[test]
  fn test_race_phase_sequence_sums_exactly() {
    for goal in [Goal::Race5k, Goal::Race10k, Goal::HalfMarathon, Goal::Marathon] {
      for weeks in 4..=30 {
        let phases = race_phase_sequence(weeks, goal).unwrap();
        assert_eq!(total(&phases), weeks, "{} at {} weeks", goal, weeks);
        assert!(phases.iter().all(|p| p.weeks >= 1));
      }
    }
  }

  #[test]
  fn test_race_phase_sequence_16_week_10k_split() {
    let phases = race_phase_sequence(16, Goal::Race10k).unwrap();
    assert_eq!(phases[0], Phase::new(PhaseKind::Base, 6));
    assert_eq!(phases[1], Phase::new(PhaseKind::Build, 5));
    assert_eq!(phases[2], Phase::new(PhaseKind::Peak, 3));
    assert_eq!(phases[3], Phase::new(PhaseKind::Taper, 2));
  }

  #[test]
  fn test_race_phase_sequence_rejects_short_plans() {
    assert!(race_phase_sequence(3, Goal::Race10k).is_err());
  }

  #[test]
  fn test_race_phase_sequence_rejects_non_race_goal() {
    assert!(race_phase_sequence(16, Goal::GeneralFitness).is_err());
  }

  #[test]
  fn test_fitness_phase_sequence_mesocycles() {
    let phases = fitness_phase_sequence(10).unwrap();
    // 3+1, 3+1, then a 2-week partial build; never a trailing recovery.
    assert_eq!(
      phases,
      vec![
        Phase::new(PhaseKind::Build, 3),
        Phase::new(PhaseKind::Recovery, 1),
        Phase::new(PhaseKind::Build, 3),
        Phase::new(PhaseKind::Recovery, 1),
        Phase::new(PhaseKind::Build, 2),
      ]
    );
    assert_eq!(total(&phases), 10);
  }

  #[test]
  fn test_fitness_phase_sequence_never_ends_on_recovery() {
    for weeks in 1..=24 {
      let phases = fitness_phase_sequence(weeks).unwrap();
      assert_eq!(total(&phases), weeks);
      if weeks % 4 != 0 {
        assert_eq!(phases.last().unwrap().kind, PhaseKind::Build);
      }
    }
  }

  #[test]
  fn test_return_to_run_opens_with_recovery_and_never_peaks() {
    for weeks in 2..=20 {
      let phases = return_to_run_phase_sequence(weeks).unwrap();
      assert_eq!(total(&phases), weeks);
      assert_eq!(phases[0].kind, PhaseKind::Recovery);
      assert!(phases
        .iter()
        .all(|p| !matches!(p.kind, PhaseKind::Peak | PhaseKind::Taper)));
    }
  }

  #[test]
  fn test_return_to_run_short_plan_has_no_build() {
    let phases = return_to_run_phase_sequence(6).unwrap();
    assert_eq!(
      phases,
      vec![
        Phase::new(PhaseKind::Recovery, 2),
        Phase::new(PhaseKind::Base, 4),
      ]
    );
  }

  #[test]
  fn test_volume_progression_length_matches_phases() {
    let phases = race_phase_sequence(16, Goal::Race10k).unwrap();
    let volumes = volume_progression(20.0, 50.0, &phases);
    assert_eq!(volumes.len() as u32, total(&phases));
  }

  #[test]
  fn test_volume_progression_respects_increase_cap() {
    let phases = race_phase_sequence(16, Goal::Race10k).unwrap();
    let volumes = volume_progression(20.0, 50.0, &phases);
    let cap = 20.0 * MAX_WEEKLY_INCREASE_PCT + 1e-9;

    // Within base/build (first 11 weeks), increases over the running maximum
    // never exceed 10% of the starting volume; dips are recovery weeks.
    let mut prior = volumes[0];
    for &v in &volumes[1..11] {
      if v > prior {
        assert!(v - prior <= cap, "increase {} -> {}", prior, v);
      }
      prior = prior.max(v);
    }
  }

  #[test]
  fn test_volume_progression_16_week_scenario() {
    let phases = race_phase_sequence(16, Goal::Race10k).unwrap();
    let volumes = volume_progression(20.0, 50.0, &phases);

    assert!((volumes[0] - 20.0).abs() < 1e-9);
    // Cumulative base/build weeks 4 and 8 are reduced weeks.
    assert!(volumes[3] < volumes[2]);
    assert!(volumes[7] < volumes[6]);
    // Peak weeks hold the peak value.
    assert_eq!(&volumes[11..14], &[50.0, 50.0, 50.0]);
    // Taper decays to 50% of peak by the final week.
    assert!((volumes[15] - 25.0).abs() < 1e-9);
    assert!(volumes[14] > volumes[15]);
  }

  #[test]
  fn test_volume_progression_recovery_phase_is_80_pct_of_prior() {
    let phases = fitness_phase_sequence(8).unwrap();
    let volumes = volume_progression(20.0, 26.0, &phases);
    assert_eq!(volumes.len(), 8);
    // Week 4 is the recovery phase following build week 3.
    assert!((volumes[3] - volumes[2] * 0.8).abs() < 1e-9);
  }

  #[test]
  fn test_volume_progression_edge_cases() {
    assert!(volume_progression(20.0, 50.0, &[]).is_empty());

    let single = volume_progression(20.0, 50.0, &[Phase::new(PhaseKind::Base, 1)]);
    assert_eq!(single, vec![20.0]);
  }

  #[test]
  fn test_frequency_progression_linear() {
    assert_eq!(frequency_progression(3, 6, 4).unwrap(), vec![3, 4, 5, 6]);
  }

  #[test]
  fn test_frequency_progression_constant() {
    assert_eq!(frequency_progression(5, 5, 6).unwrap(), vec![5; 6]);
  }

  #[test]
  fn test_frequency_progression_clamped_and_monotone() {
    let freqs = frequency_progression(2, 8, 10).unwrap();
    assert!(freqs.iter().all(|&f| (MIN_FREQUENCY..=MAX_FREQUENCY).contains(&f)));
    assert!(freqs.windows(2).all(|w| w[0] <= w[1]));
  }
}
