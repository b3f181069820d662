//! Fitness assessment
//!
//! Derives the athlete's current state from what the database already knows:
//! recent run efforts, training volume over a lookback window, and the
//! settings singleton (device VO2max, threshold heart rate). The plan
//! generator consumes this through the `FitnessAssessor` trait so tests can
//! substitute fixed values.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::capability::{self, HrZones};
use crate::error::PlanError;

/// Efforts shorter than this are too noisy to invert into a capability.
const MIN_EFFORT_METERS: f64 = 3000.0;

/// Starting point when the database holds no usable signal.
const DEFAULT_SCALAR: f64 = 35.0;

/// ---------------------------------------------------------------------------
/// Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FitnessSource {
  RecentActivity { activity_id: i64 },
  DeviceEstimate,
  Default,
}

/// Snapshot of current fitness over a lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessSnapshot {
  pub scalar: f64,
  pub source: FitnessSource,
  /// Average weekly run volume over the window, if any runs were logged.
  pub weekly_volume_km: Option<f64>,
  /// Average runs per week over the window, if any runs were logged.
  pub runs_per_week: Option<u32>,
  /// Derived from stored threshold heart rate, when set.
  pub hr_zones: Option<HrZones>,
}

pub trait FitnessAssessor {
  fn assess(
    &self,
    lookback_weeks: u32,
  ) -> impl std::future::Future<Output = Result<FitnessSnapshot, PlanError>> + Send;
}

/// ---------------------------------------------------------------------------
/// Database-backed assessor
/// ---------------------------------------------------------------------------

pub struct DbFitnessAssessor {
  pool: SqlitePool,
}

struct ActivitySummary {
  best: Option<(i64, f64)>,
  weekly_volume_km: Option<f64>,
  runs_per_week: Option<u32>,
}

impl DbFitnessAssessor {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Volume, frequency, and the strongest capability-implying effort across
  /// run activities in the window.
  async fn summarize_activities(
    &self,
    lookback_weeks: u32,
  ) -> Result<ActivitySummary, PlanError> {
    let cutoff = (Utc::now() - Duration::weeks(i64::from(lookback_weeks))).to_rfc3339();

    let rows: Vec<(i64, Option<f64>, Option<i64>)> = sqlx::query_as(
      "SELECT id, distance_meters, duration_seconds
       FROM activities
       WHERE activity_type = 'run' AND started_at >= ?1
       ORDER BY started_at DESC",
    )
    .bind(&cutoff)
    .fetch_all(&self.pool)
    .await?;

    let mut best: Option<(i64, f64)> = None;
    let mut total_km = 0.0;
    for (id, distance_meters, duration_seconds) in &rows {
      let distance = distance_meters.unwrap_or(0.0);
      total_km += distance / 1000.0;

      if distance < MIN_EFFORT_METERS {
        continue;
      }
      if let Some(seconds) = duration_seconds.filter(|s| *s > 0) {
        let scalar = capability::capability_from_race(distance / 1000.0, seconds as f64)?;
        if best.map_or(true, |(_, b)| scalar > b) {
          best = Some((*id, scalar));
        }
      }
    }

    let (weekly_volume_km, runs_per_week) = if rows.is_empty() || lookback_weeks == 0 {
      (None, None)
    } else {
      let weeks = f64::from(lookback_weeks);
      (
        Some(total_km / weeks),
        Some((rows.len() as f64 / weeks).round().max(1.0) as u32),
      )
    };

    Ok(ActivitySummary { best, weekly_volume_km, runs_per_week })
  }

  /// Calibrated device VO2max and HR zones from the settings singleton.
  async fn settings_signal(&self) -> Result<(Option<f64>, Option<HrZones>), PlanError> {
    let row: Option<(Option<f64>, Option<i64>, Option<i64>)> = sqlx::query_as(
      "SELECT device_vo2max, threshold_hr, max_hr FROM athlete_settings WHERE id = 1",
    )
    .fetch_optional(&self.pool)
    .await?;

    let Some((device_vo2max, threshold_hr, max_hr)) = row else {
      return Ok((None, None));
    };

    let scalar = device_vo2max
      .map(capability::capability_from_device_estimate)
      .transpose()?;
    let hr_zones = threshold_hr
      .map(|t| capability::hr_zones_from_threshold(t as u16, max_hr.map(|m| m as u16)))
      .transpose()?;

    Ok((scalar, hr_zones))
  }
}

impl FitnessAssessor for DbFitnessAssessor {
  /// Prefers the strongest recent effort, falls back to the device estimate,
  /// then to a conservative default.
  async fn assess(&self, lookback_weeks: u32) -> Result<FitnessSnapshot, PlanError> {
    let summary = self.summarize_activities(lookback_weeks).await?;
    let (device_scalar, hr_zones) = self.settings_signal().await?;

    let (scalar, source) = match (summary.best, device_scalar) {
      (Some((id, effort)), Some(device)) if effort >= device => {
        (effort, FitnessSource::RecentActivity { activity_id: id })
      }
      (_, Some(device)) => (device, FitnessSource::DeviceEstimate),
      (Some((id, effort)), None) => (effort, FitnessSource::RecentActivity { activity_id: id }),
      (None, None) => (DEFAULT_SCALAR, FitnessSource::Default),
    };

    Ok(FitnessSnapshot {
      scalar,
      source,
      weekly_volume_km: summary.weekly_volume_km,
      runs_per_week: summary.runs_per_week,
      hr_zones,
    })
  }
}

/// Fixed-value assessor for generator tests.
#[cfg(test)]
pub struct FixedAssessor(pub f64);

#[cfg(test)]
impl FitnessAssessor for FixedAssessor {
  async fn assess(&self, _lookback_weeks: u32) -> Result<FitnessSnapshot, PlanError> {
    Ok(FitnessSnapshot {
      scalar: self.0,
      source: FitnessSource::Default,
      weekly_volume_km: None,
      runs_per_week: None,
      hr_zones: None,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
