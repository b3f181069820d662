use serde::{Deserialize, Serialize};

use crate::db::AppState;

/// Athlete settings singleton consumed by the fitness assessor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AthleteSettings {
  pub threshold_hr: Option<i64>,
  pub max_hr: Option<i64>,
  pub device_vo2max: Option<f64>,
}

pub async fn get_athlete_settings(state: &AppState) -> Result<AthleteSettings, String> {
  let row: Option<(Option<i64>, Option<i64>, Option<f64>)> = sqlx::query_as(
    "SELECT threshold_hr, max_hr, device_vo2max FROM athlete_settings WHERE id = 1",
  )
  .fetch_optional(&state.db)
  .await
  .map_err(|e| format!("Failed to get settings: {}", e))?;

  match row {
    Some((threshold_hr, max_hr, device_vo2max)) => {
      Ok(AthleteSettings { threshold_hr, max_hr, device_vo2max })
    }
    None => Ok(AthleteSettings::default()),
  }
}

/// Update individual settings; absent fields keep their stored value.
pub async fn update_athlete_settings(
  state: &AppState,
  threshold_hr: Option<i64>,
  max_hr: Option<i64>,
  device_vo2max: Option<f64>,
) -> Result<(), String> {
  sqlx::query(
    r#"
    UPDATE athlete_settings SET
      threshold_hr = COALESCE(?1, threshold_hr),
      max_hr = COALESCE(?2, max_hr),
      device_vo2max = COALESCE(?3, device_vo2max),
      updated_at = CURRENT_TIMESTAMP
    WHERE id = 1
    "#,
  )
  .bind(threshold_hr)
  .bind(max_hr)
  .bind(device_vo2max)
  .execute(&state.db)
  .await
  .map_err(|e| format!("Failed to update settings: {}", e))?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::setup_test_db;

  #[tokio::test]
  async fn test_settings_round_trip_and_partial_update() {
    let pool = setup_test_db().await;
    let state = AppState { db: pool };

    let initial = get_athlete_settings(&state).await.unwrap();
    assert!(initial.threshold_hr.is_none());

    update_athlete_settings(&state, Some(170), Some(188), None).await.unwrap();
    update_athlete_settings(&state, None, None, Some(49.0)).await.unwrap();

    let settings = get_athlete_settings(&state).await.unwrap();
    assert_eq!(settings.threshold_hr, Some(170));
    assert_eq!(settings.max_hr, Some(188));
    assert_eq!(settings.device_vo2max, Some(49.0));
  }
}
