//! Physiological capability model
//!
//! Converts race performance (or a device-reported aerobic-capacity estimate)
//! into a single capability scalar, and derives pace and heart-rate training
//! zones from it. Pure arithmetic, no I/O.
//!
//! The model pairs a velocity -> metabolic-cost curve with a race-duration ->
//! sustainable-fraction curve: a race performance implies
//! `cost(v) = fraction(t) * scalar`.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::models::workout::{HrRange, PaceRange};

/// ---------------------------------------------------------------------------
/// Model Constants
/// ---------------------------------------------------------------------------

/// Metabolic cost curve: cost(v) = COST_C + COST_B*v + COST_A*v^2 (v in m/min)
const COST_A: f64 = 0.000_104;
const COST_B: f64 = 0.182_258;
const COST_C: f64 = -4.60;

/// Sustainable fraction of capability by race duration (t in minutes):
/// frac(t) = 0.8 + 0.189_439_3*e^(-0.012_778*t) + 0.298_955_8*e^(-0.193_260_5*t)
const FRAC_BASE: f64 = 0.8;
const FRAC_K1: f64 = 0.189_439_3;
const FRAC_E1: f64 = -0.012_778;
const FRAC_K2: f64 = 0.298_955_8;
const FRAC_E2: f64 = -0.193_260_5;

/// Empirical calibration for device-reported aerobic capacity values.
const DEVICE_CALIBRATION: f64 = 0.98;

/// Floor for velocities solved out of the cost curve (m/min).
const VELOCITY_EPSILON: f64 = 0.001;

/// Zone intensities as fractions of the capability scalar.
const PCT_EASY_LOW: f64 = 0.59;
const PCT_EASY_HIGH: f64 = 0.74;
const PCT_MARATHON: f64 = 0.84;
const PCT_THRESHOLD: f64 = 0.88;
const PCT_INTERVAL: f64 = 0.975;
const PCT_REPETITION: f64 = 1.05;

/// HR bands as fractions of threshold heart rate: (low, high) per intensity.
const HR_EASY: (f64, f64) = (0.70, 0.85);
const HR_MARATHON: (f64, f64) = (0.85, 0.92);
const HR_THRESHOLD: (f64, f64) = (0.92, 1.00);
const HR_INTERVAL: (f64, f64) = (1.00, 1.05);

/// Race-time prediction: bisection bounds and budget.
const PREDICT_MIN_SECONDS: f64 = 1.0;
const PREDICT_MAX_SECONDS: f64 = 86_400.0;
const PREDICT_TOLERANCE: f64 = 1e-4;
const PREDICT_MAX_ITERATIONS: u32 = 200;

/// ---------------------------------------------------------------------------
/// Zone Sets
/// ---------------------------------------------------------------------------

/// Training paces in seconds per km, strictly positive. Slower zones carry
/// larger values: easy_low > easy_high > marathon > threshold > interval >
/// repetition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaceZones {
  pub easy_low_sec_per_km: f64,
  pub easy_high_sec_per_km: f64,
  pub marathon_sec_per_km: f64,
  pub threshold_sec_per_km: f64,
  pub interval_sec_per_km: f64,
  pub repetition_sec_per_km: f64,
}

impl PaceZones {
  /// The easy band as a pace range (slow bound first).
  pub fn easy_range(&self) -> PaceRange {
    PaceRange {
      low_sec_per_km: self.easy_low_sec_per_km,
      high_sec_per_km: self.easy_high_sec_per_km,
    }
  }
}

/// Heart-rate bands per intensity. Each band has low < high and successive
/// bands do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrZones {
  pub easy: HrRange,
  pub marathon: HrRange,
  pub threshold: HrRange,
  pub interval: HrRange,
}

/// Capability scalar plus everything derived from it. Computed per
/// plan-generation call and embedded in the plan, never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityEstimate {
  pub scalar: f64,
  pub pace_zones: PaceZones,
  pub hr_zones: Option<HrZones>,
}

impl CapabilityEstimate {
  /// Build the full estimate from a scalar, deriving its pace zones.
  pub fn from_scalar(scalar: f64, hr_zones: Option<HrZones>) -> Result<Self, PlanError> {
    Ok(Self { scalar, pace_zones: pace_zones(scalar)?, hr_zones })
  }
}

/// ---------------------------------------------------------------------------
/// Core Curves
/// ---------------------------------------------------------------------------

/// Metabolic cost of running at `velocity` m/min.
fn metabolic_cost(velocity: f64) -> f64 {
  COST_C + COST_B * velocity + COST_A * velocity * velocity
}

/// Fraction of the capability scalar sustainable for a race of `minutes`.
fn sustainable_fraction(minutes: f64) -> f64 {
  FRAC_BASE + FRAC_K1 * (FRAC_E1 * minutes).exp() + FRAC_K2 * (FRAC_E2 * minutes).exp()
}

/// Invert the cost curve: velocity (m/min) at which running costs `cost`.
/// Positive root of the quadratic, floored to stay physical.
fn velocity_for_cost(cost: f64) -> f64 {
  let discriminant = COST_B * COST_B - 4.0 * COST_A * (COST_C - cost);
  if discriminant <= 0.0 {
    return VELOCITY_EPSILON;
  }
  let velocity = (-COST_B + discriminant.sqrt()) / (2.0 * COST_A);
  velocity.max(VELOCITY_EPSILON)
}

/// ---------------------------------------------------------------------------
/// Capability Scalar
/// ---------------------------------------------------------------------------

/// Capability scalar implied by a race of `distance_km` in `time_seconds`.
pub fn capability_from_race(distance_km: f64, time_seconds: f64) -> Result<f64, PlanError> {
  if distance_km <= 0.0 {
    return Err(PlanError::InvalidInput("Race distance must be positive".into()));
  }
  if time_seconds <= 0.0 {
    return Err(PlanError::InvalidInput("Race time must be positive".into()));
  }

  let minutes = time_seconds / 60.0;
  let velocity = (distance_km * 1000.0) / minutes;

  // cost(v) = fraction(t) * scalar, solved directly for the scalar.
  Ok(metabolic_cost(velocity) / sustainable_fraction(minutes))
}

/// Capability scalar from an externally reported aerobic-capacity number.
pub fn capability_from_device_estimate(value: f64) -> Result<f64, PlanError> {
  if value <= 0.0 {
    return Err(PlanError::InvalidInput("Device estimate must be positive".into()));
  }
  Ok(value * DEVICE_CALIBRATION)
}

/// ---------------------------------------------------------------------------
/// Pace Zones
/// ---------------------------------------------------------------------------

fn pace_at_fraction(scalar: f64, fraction: f64) -> f64 {
  let velocity = velocity_for_cost(scalar * fraction);
  (1000.0 / velocity) * 60.0
}

/// Derive the six training paces from the capability scalar.
pub fn pace_zones(scalar: f64) -> Result<PaceZones, PlanError> {
  if scalar <= 0.0 {
    return Err(PlanError::InvalidInput("Capability scalar must be positive".into()));
  }

  Ok(PaceZones {
    easy_low_sec_per_km: pace_at_fraction(scalar, PCT_EASY_LOW),
    easy_high_sec_per_km: pace_at_fraction(scalar, PCT_EASY_HIGH),
    marathon_sec_per_km: pace_at_fraction(scalar, PCT_MARATHON),
    threshold_sec_per_km: pace_at_fraction(scalar, PCT_THRESHOLD),
    interval_sec_per_km: pace_at_fraction(scalar, PCT_INTERVAL),
    repetition_sec_per_km: pace_at_fraction(scalar, PCT_REPETITION),
  })
}

/// ---------------------------------------------------------------------------
/// Race-Time Prediction
/// ---------------------------------------------------------------------------

/// Predict the race time for `distance_km` at the given capability scalar.
///
/// There is no closed form in this direction; bisect over [1s, 24h] until the
/// implied scalar is within tolerance. If the iteration budget runs out the
/// midpoint of the final bracket is returned - a policy choice, not an error.
pub fn predict_race_time(scalar: f64, distance_km: f64) -> Result<f64, PlanError> {
  if scalar <= 0.0 {
    return Err(PlanError::InvalidInput("Capability scalar must be positive".into()));
  }
  if distance_km <= 0.0 {
    return Err(PlanError::InvalidInput("Race distance must be positive".into()));
  }

  let mut lo = PREDICT_MIN_SECONDS;
  let mut hi = PREDICT_MAX_SECONDS;

  for _ in 0..PREDICT_MAX_ITERATIONS {
    let mid = (lo + hi) / 2.0;
    let implied = capability_from_race(distance_km, mid)?;

    if (implied - scalar).abs() < PREDICT_TOLERANCE {
      return Ok(mid);
    }

    // Shorter times imply higher capability: too high means the candidate
    // time is too fast for this athlete.
    if implied > scalar {
      lo = mid;
    } else {
      hi = mid;
    }
  }

  Ok((lo + hi) / 2.0)
}

/// ---------------------------------------------------------------------------
/// Heart-Rate Zones
/// ---------------------------------------------------------------------------

fn hr_band(threshold_hr: u16, band: (f64, f64), max_hr: Option<u16>) -> HrRange {
  let mut low = (f64::from(threshold_hr) * band.0).round() as u16;
  let mut high = (f64::from(threshold_hr) * band.1).round() as u16;

  if let Some(cap) = max_hr {
    high = high.min(cap);
    low = low.min(high.saturating_sub(1));
  }

  HrRange { low, high }
}

/// Heart-rate bands from a threshold heart rate, upper bounds capped at
/// `max_hr` when supplied.
pub fn hr_zones_from_threshold(
  threshold_hr: u16,
  max_hr: Option<u16>,
) -> Result<HrZones, PlanError> {
  if threshold_hr == 0 {
    return Err(PlanError::InvalidInput("Threshold heart rate must be positive".into()));
  }
  if let Some(max) = max_hr {
    if max <= threshold_hr {
      return Err(PlanError::InvalidInput(format!(
        "Max heart rate {} must exceed threshold heart rate {}",
        max, threshold_hr
      )));
    }
  }

  Ok(HrZones {
    easy: hr_band(threshold_hr, HR_EASY, max_hr),
    marathon: hr_band(threshold_hr, HR_MARATHON, max_hr),
    threshold: hr_band(threshold_hr, HR_THRESHOLD, max_hr),
    interval: hr_band(threshold_hr, HR_INTERVAL, max_hr),
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
