//! Inbound activity normalization.
//!
//! Producers (the remote sync client, demo fixtures, old exports) name the
//! same fields inconsistently: `type` vs `sportType`, `distance` vs
//! `distanceKm`, `duration` vs `durationSeconds`, and dates as either Unix
//! seconds or RFC 3339 strings. This module is the single boundary that
//! folds the variants into the canonical schema; everything past it sees
//! exactly one field name per concept.

use chrono::DateTime;
use serde::Deserialize;

use crate::types::NewActivity;

/// An activity-like object as a producer hands it over.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "type")]
    pub sport_type: Option<String>,
    #[serde(default)]
    pub date: Option<RawDate>,
    #[serde(default, alias = "distance")]
    pub distance_km: Option<f64>,
    #[serde(default, alias = "duration")]
    pub duration_seconds: Option<f64>,
    #[serde(default, alias = "calories")]
    pub calories_kcal: Option<f64>,
    #[serde(default, alias = "elevationGain")]
    pub elevation_gain_m: Option<f64>,
    #[serde(default)]
    pub avg_speed_kmh: Option<f64>,
    #[serde(default)]
    pub max_speed_kmh: Option<f64>,
    #[serde(default, alias = "avgHeartRate")]
    pub avg_heart_rate_bpm: Option<u16>,
    #[serde(default, alias = "maxHeartRate")]
    pub max_heart_rate_bpm: Option<u16>,
    #[serde(default)]
    pub route_coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub weather: Option<String>,
}

/// Occurrence time in either producer encoding.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    Unix(i64),
    Text(String),
}

impl RawDate {
    pub fn to_unix(&self) -> Option<i64> {
        match self {
            RawDate::Unix(seconds) => Some(*seconds),
            RawDate::Text(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.timestamp()),
        }
    }
}

impl RawActivity {
    /// Fold into the canonical input shape.
    ///
    /// Returns `None` when the record is missing its name, sport or a
    /// readable date; negative numerics are coerced to zero the same way
    /// the store coerces them.
    pub fn normalize(&self) -> Option<NewActivity> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        let sport = self
            .sport_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        let date = self.date.as_ref()?.to_unix()?;

        Some(NewActivity {
            id: self.id.clone().filter(|id| !id.is_empty()),
            name: name.to_string(),
            sport_type: sport.to_string(),
            date,
            distance_km: self.distance_km.unwrap_or(0.0).max(0.0),
            duration_seconds: self.duration_seconds.unwrap_or(0.0).max(0.0) as i64,
            calories_kcal: self.calories_kcal.filter(|v| *v >= 0.0),
            elevation_gain_m: self.elevation_gain_m.filter(|v| *v >= 0.0),
            avg_speed_kmh: self.avg_speed_kmh,
            max_speed_kmh: self.max_speed_kmh,
            avg_heart_rate_bpm: self.avg_heart_rate_bpm,
            max_heart_rate_bpm: self.max_heart_rate_bpm,
            route_coordinates: self.route_coordinates.clone(),
            weather: self.weather.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_producer_aliases_accepted() {
        let raw: RawActivity = serde_json::from_value(json!({
            "name": "Evening Bike Ride",
            "type": "Ride",
            "distance": 15.8,
            "duration": 2700,
            "calories": 480,
            "date": "2024-05-01T18:00:00Z"
        }))
        .unwrap();

        let new = raw.normalize().unwrap();
        assert_eq!(new.sport_type, "Ride");
        assert!((new.distance_km - 15.8).abs() < 1e-9);
        assert_eq!(new.duration_seconds, 2700);
        assert_eq!(new.calories_kcal, Some(480.0));
        assert_eq!(new.date, 1_714_586_400);
    }

    #[test]
    fn test_canonical_names_accepted() {
        let raw: RawActivity = serde_json::from_value(json!({
            "name": "Morning Run",
            "sportType": "Run",
            "distanceKm": 5.2,
            "durationSeconds": 1800,
            "date": 1_714_548_600
        }))
        .unwrap();

        let new = raw.normalize().unwrap();
        assert_eq!(new.sport_type, "Run");
        assert_eq!(new.date, 1_714_548_600);
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        let no_sport: RawActivity = serde_json::from_value(json!({
            "name": "Mystery",
            "date": 1_714_548_600
        }))
        .unwrap();
        assert!(no_sport.normalize().is_none());

        let no_date: RawActivity = serde_json::from_value(json!({
            "name": "Run",
            "type": "Run"
        }))
        .unwrap();
        assert!(no_date.normalize().is_none());

        let bad_date: RawActivity = serde_json::from_value(json!({
            "name": "Run",
            "type": "Run",
            "date": "last tuesday"
        }))
        .unwrap();
        assert!(bad_date.normalize().is_none());
    }

    #[test]
    fn test_negative_numerics_coerced() {
        let raw: RawActivity = serde_json::from_value(json!({
            "name": "Odd",
            "type": "Run",
            "date": 1_714_548_600,
            "distance": -3.0,
            "duration": -120,
            "calories": -50
        }))
        .unwrap();

        let new = raw.normalize().unwrap();
        assert_eq!(new.distance_km, 0.0);
        assert_eq!(new.duration_seconds, 0);
        assert_eq!(new.calories_kcal, None);
    }

    #[test]
    fn test_blank_id_discarded() {
        let raw: RawActivity = serde_json::from_value(json!({
            "id": "",
            "name": "Run",
            "type": "Run",
            "date": 1_714_548_600
        }))
        .unwrap();
        assert_eq!(raw.normalize().unwrap().id, None);
    }
}
