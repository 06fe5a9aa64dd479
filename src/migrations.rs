//! Persisted-state schema migrations.
//!
//! The stored blob carries a version marker next to it. On open, a blob
//! with an older known version is run through the ordered chain of pure
//! transforms below; unknown or newer versions, and failed transforms,
//! fall back to a destructive reset. Earlier builds wiped all data on any
//! version mismatch; migrating known versions replaces that behavior, and
//! the reset fallback is logged so the condition stays visible to the
//! product owner.
//!
//! Version history:
//! - v1: producer field names persisted raw (`type`, `distance`,
//!   `duration`, `calories`), RFC 3339 date strings, no achievements key.
//! - v2: canonical camelCase field names, Unix-second dates, achievements
//!   collection.
//! - v3: persisted stats overview and `lastImportedAt`.

use chrono::DateTime;
use log::info;
use serde_json::{json, Map, Value};

use crate::types::StatsOverview;

/// Schema version the engine reads and writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

const CHAIN: [(u32, fn(Value) -> Result<Value, String>); 2] = [(1, v1_to_v2), (2, v2_to_v3)];

/// Apply every transform from `from` up to the current version.
///
/// Each step is idempotent on already-migrated keys, so a partially
/// upgraded blob is safe to run through the chain again.
pub fn run_chain(from: u32, mut state: Value) -> Result<Value, String> {
    for (version, step) in CHAIN {
        if version >= from {
            info!(
                "[Migrations] applying schema migration v{} -> v{}",
                version,
                version + 1
            );
            state = step(state)?;
        }
    }
    Ok(state)
}

/// v1 -> v2: canonical field names, Unix-second dates, achievements key.
fn v1_to_v2(state: Value) -> Result<Value, String> {
    let Value::Object(mut root) = state else {
        return Err("v1 state is not an object".to_string());
    };

    let entries = match root.remove("activities") {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };
    let mut migrated = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;
    for entry in entries {
        match convert_v1_activity(entry) {
            Some(activity) => migrated.push(activity),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        info!(
            "[Migrations] dropped {} v1 activity record(s) that could not be converted",
            dropped
        );
    }

    root.insert("activities".to_string(), Value::Array(migrated));
    root.entry("achievements").or_insert_with(|| json!([]));
    Ok(Value::Object(root))
}

/// v2 -> v3: persisted stats overview. `lastImportedAt` stays absent
/// until the first import stamps it.
fn v2_to_v3(state: Value) -> Result<Value, String> {
    let Value::Object(mut root) = state else {
        return Err("v2 state is not an object".to_string());
    };
    let zeroed = serde_json::to_value(StatsOverview::default()).map_err(|e| e.to_string())?;
    root.entry("stats").or_insert(zeroed);
    Ok(Value::Object(root))
}

/// Convert one v1 activity object in place, or drop it when the required
/// identity fields are missing or its date cannot be read.
fn convert_v1_activity(entry: Value) -> Option<Value> {
    let Value::Object(mut fields) = entry else {
        return None;
    };

    rename(&mut fields, "type", "sportType");
    rename(&mut fields, "distance", "distanceKm");
    rename(&mut fields, "duration", "durationSeconds");
    rename(&mut fields, "calories", "caloriesKcal");
    rename(&mut fields, "created_at", "createdAt");

    fields.get("id").and_then(Value::as_str)?;
    fields.get("name").and_then(Value::as_str)?;
    fields.get("sportType").and_then(Value::as_str)?;

    let date = parse_timestamp(fields.get("date"))?;
    fields.insert("date".to_string(), json!(date));

    let created = parse_timestamp(fields.get("createdAt")).unwrap_or(date);
    fields.insert("createdAt".to_string(), json!(created));
    fields.entry("updatedAt").or_insert_with(|| json!(created));

    let distance = fields
        .get("distanceKm")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    fields.insert("distanceKm".to_string(), json!(distance.max(0.0)));

    let duration = fields
        .get("durationSeconds")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    fields.insert(
        "durationSeconds".to_string(),
        json!(duration.max(0.0) as i64),
    );

    Some(Value::Object(fields))
}

/// Read a timestamp stored either as Unix seconds or an RFC 3339 string.
fn parse_timestamp(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.timestamp()),
        _ => None,
    }
}

fn rename(fields: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = fields.remove(from) {
        fields.entry(to).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PersistedState;

    #[test]
    fn test_v1_chain_converts_producer_fields() {
        let v1 = json!({
            "activities": [{
                "id": "1",
                "name": "Morning Run",
                "type": "Run",
                "distance": 5.2,
                "duration": 1800,
                "calories": 320,
                "date": "2024-05-01T07:30:00Z",
                "created_at": "2024-05-01T08:00:00Z"
            }],
            "user": null,
            "settings": {}
        });

        let migrated = run_chain(1, v1).unwrap();
        let state: PersistedState = serde_json::from_value(migrated).unwrap();

        assert_eq!(state.activities.len(), 1);
        let a = &state.activities[0];
        assert_eq!(a.sport_type, "Run");
        assert!((a.distance_km - 5.2).abs() < 1e-9);
        assert_eq!(a.duration_seconds, 1800);
        assert_eq!(a.calories_kcal, Some(320.0));
        assert_eq!(a.date, 1_714_548_600);
        assert_eq!(a.created_at, 1_714_550_400);
        assert_eq!(a.updated_at, a.created_at);
        assert!(state.achievements.is_empty());
    }

    #[test]
    fn test_v1_drops_unconvertible_records() {
        let v1 = json!({
            "activities": [
                { "id": "1", "name": "Run", "type": "Run", "distance": 3.0,
                  "duration": 900, "date": "2024-05-01T07:30:00Z" },
                { "id": "2", "name": "Broken", "type": "Run", "distance": 3.0,
                  "duration": 900, "date": "yesterday-ish" },
                { "name": "No id", "type": "Walk", "date": "2024-05-01T07:30:00Z" }
            ]
        });

        let migrated = run_chain(1, v1).unwrap();
        let state: PersistedState = serde_json::from_value(migrated).unwrap();
        assert_eq!(state.activities.len(), 1);
        assert_eq!(state.activities[0].id, "1");
    }

    #[test]
    fn test_v2_chain_only_adds_stats() {
        let v2 = json!({
            "activities": [],
            "achievements": [],
            "settings": { "theme": "dark" }
        });

        let migrated = run_chain(2, v2).unwrap();
        assert!(migrated.get("stats").is_some());

        let state: PersistedState = serde_json::from_value(migrated).unwrap();
        assert_eq!(state.settings.theme, "dark");
        assert_eq!(state.stats.all_time.activities, 0);
    }

    #[test]
    fn test_negative_v1_numbers_coerced_to_zero() {
        let v1 = json!({
            "activities": [{
                "id": "1", "name": "Odd", "type": "Run",
                "distance": -4.0, "duration": -60,
                "date": 1_714_548_600
            }]
        });

        let migrated = run_chain(1, v1).unwrap();
        let state: PersistedState = serde_json::from_value(migrated).unwrap();
        assert_eq!(state.activities[0].distance_km, 0.0);
        assert_eq!(state.activities[0].duration_seconds, 0);
    }

    #[test]
    fn test_non_object_state_fails() {
        assert!(run_chain(1, json!([1, 2, 3])).is_err());
    }
}
