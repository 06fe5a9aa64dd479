//! Snapshot import/export integration tests.
//!
//! The law under test: importing an exported snapshot leaves the activity
//! and achievement collections content- and order-equal. Plus the
//! best-effort rules for malformed payload entries and the settings merge.

use std::time::{SystemTime, UNIX_EPOCH};

use fittrackrs::{ActivityStore, EngineError, NewActivity};
use serde_json::json;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn new_activity(name: &str, sport: &str, date: i64, distance: f64) -> NewActivity {
    NewActivity {
        name: name.to_string(),
        sport_type: sport.to_string(),
        date,
        distance_km: distance,
        duration_seconds: 1800,
        calories_kcal: Some(300.0),
        ..Default::default()
    }
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_import_of_export_is_identity_on_collections() {
    init_logging();
    let mut source = ActivityStore::in_memory();
    let base = now();
    source.add(new_activity("Run A", "Run", base, 10.0));
    source.add(new_activity("Ride B", "Ride", base - 86_400, 25.0));
    source.add(new_activity("Hike C", "Hike", base - 2 * 86_400, 8.0));
    source.evaluate_achievements();

    let snapshot = source.export_snapshot();
    let document = serde_json::to_value(&snapshot).unwrap();

    let mut target = ActivityStore::in_memory();
    let summary = target.import_snapshot(&document).unwrap();

    assert_eq!(summary.activities, 3);
    assert_eq!(summary.skipped_activities, 0);
    assert_eq!(target.activities(), source.activities());
    assert_eq!(target.achievements(), source.achievements());
    assert_eq!(
        target.stats().all_time.activities,
        source.stats().all_time.activities
    );
}

#[test]
fn test_export_is_a_deep_copy() {
    init_logging();
    let mut store = ActivityStore::in_memory();
    store.add(new_activity("Run", "Run", now(), 5.0));

    let snapshot = store.export_snapshot();
    assert!(snapshot.exported_at > 0);

    // Later mutations do not reach into the exported copy
    store.add(new_activity("Ride", "Ride", now(), 20.0));
    assert_eq!(snapshot.state.activities.len(), 1);
    assert_eq!(store.activities().len(), 2);
}

#[test]
fn test_import_stamps_import_time() {
    init_logging();
    let mut store = ActivityStore::in_memory();
    store
        .import_snapshot(&json!({ "activities": [] }))
        .unwrap();
    assert!(store.export_snapshot().state.last_imported_at.is_some());
}

// ============================================================================
// Wholesale rejection vs best-effort
// ============================================================================

#[test]
fn test_non_object_payload_is_invalid_format() {
    init_logging();
    let mut store = ActivityStore::in_memory();

    for payload in [json!([1, 2, 3]), json!("backup"), json!(null), json!(42)] {
        match store.import_snapshot(&payload) {
            Err(EngineError::InvalidFormat(_)) => {}
            other => panic!("expected InvalidFormat, got {:?}", other),
        }
    }
}

#[test]
fn test_malformed_records_are_skipped_and_counted() {
    init_logging();
    let mut store = ActivityStore::in_memory();

    let summary = store
        .import_snapshot(&json!({
            "activities": [
                { "id": "ok-1", "name": "Run", "sportType": "Run", "date": 1_714_548_600,
                  "distanceKm": 5.0, "durationSeconds": 1800,
                  "createdAt": 1_714_548_600, "updatedAt": 1_714_548_600 },
                { "name": "no id, no required fields" },
                "not even an object"
            ]
        }))
        .unwrap();

    assert_eq!(summary.activities, 1);
    assert_eq!(summary.skipped_activities, 2);
    assert_eq!(store.activities().len(), 1);
    assert_eq!(store.activities()[0].id, "ok-1");
}

#[test]
fn test_duplicate_ids_keep_first_occurrence() {
    init_logging();
    let mut store = ActivityStore::in_memory();

    let record = |name: &str, distance: f64| {
        json!({ "id": "dup", "name": name, "sportType": "Run", "date": 1_714_548_600,
                "distanceKm": distance, "durationSeconds": 1800,
                "createdAt": 1_714_548_600, "updatedAt": 1_714_548_600 })
    };
    let summary = store
        .import_snapshot(&json!({ "activities": [record("First", 5.0), record("Second", 9.0)] }))
        .unwrap();

    assert_eq!(summary.activities, 1);
    assert_eq!(summary.skipped_activities, 1);
    assert_eq!(store.activities()[0].name, "First");
}

#[test]
fn test_import_replaces_collections_wholesale() {
    init_logging();
    let mut store = ActivityStore::in_memory();
    store.add(new_activity("Old Run", "Run", now(), 5.0));

    store
        .import_snapshot(&json!({
            "activities": [
                { "id": "imported-1", "name": "Imported Ride", "sportType": "Ride",
                  "date": 1_714_548_600, "distanceKm": 30.0, "durationSeconds": 5400,
                  "createdAt": 1_714_548_600, "updatedAt": 1_714_548_600 }
            ]
        }))
        .unwrap();

    assert_eq!(store.activities().len(), 1);
    assert_eq!(store.activities()[0].id, "imported-1");
    assert!((store.stats().all_time.distance - 30.0).abs() < 1e-9);
}

#[test]
fn test_absent_keys_leave_stored_collections_alone() {
    init_logging();
    let mut store = ActivityStore::in_memory();
    store.add(new_activity("Kept Run", "Run", now(), 5.0));
    store.evaluate_achievements();
    let achievements_before = store.achievements().to_vec();

    store.import_snapshot(&json!({ "settings": {} })).unwrap();

    assert_eq!(store.activities().len(), 1);
    assert_eq!(store.achievements(), achievements_before.as_slice());
}

// ============================================================================
// Settings merge
// ============================================================================

#[test]
fn test_settings_merge_imported_fields_win() {
    init_logging();
    let mut store = ActivityStore::in_memory();

    store
        .import_snapshot(&json!({ "settings": { "theme": "dark" } }))
        .unwrap();

    // Imported field overwrote, the rest kept their defaults
    assert_eq!(store.settings().theme, "dark");
    assert_eq!(store.settings().units, "metric");
    assert!(store.settings().notifications);
    assert_eq!(store.settings().weekly_goals.activities, 4);
}

#[test]
fn test_user_replaced_wholesale_when_present() {
    init_logging();
    let mut store = ActivityStore::in_memory();
    store.set_user(fittrackrs::UserUpdate {
        name: Some("Before".to_string()),
        email: Some("before@example.com".to_string()),
        ..Default::default()
    });

    store
        .import_snapshot(&json!({ "user": { "name": "After" } }))
        .unwrap();

    let user = store.user().unwrap();
    assert_eq!(user.name.as_deref(), Some("After"));
    // Wholesale replacement, unlike set_user's merge
    assert_eq!(user.email, None);
}

// ============================================================================
// Export filename
// ============================================================================

#[test]
fn test_export_file_name_embeds_date() {
    // 2024-05-01T07:30:00Z
    assert_eq!(
        ActivityStore::export_file_name(1_714_548_600),
        "fittracker-export-2024-05-01.json"
    );
}
