//! Core data model for the activity store.
//!
//! These types are plain serde data containers: everything the store
//! persists and everything the read accessors hand to the app layer. Wire
//! names are camelCase to match the exported JSON document.

use serde::{Deserialize, Serialize};

// ============================================================================
// Activities
// ============================================================================

/// One logged exercise session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Unique identifier, assigned by the store at creation if absent
    pub id: String,
    /// Display name (e.g., "Morning Run")
    pub name: String,
    /// Sport type ("Run", "Ride", "Swim", "Walk", "Hike", "Workout", ...)
    pub sport_type: String,
    /// Occurrence time as Unix seconds. Distinct from `created_at`.
    pub date: i64,
    /// Distance in kilometres, 0 for non-distance sports
    pub distance_km: f64,
    /// Duration in seconds
    pub duration_seconds: i64,
    /// Energy burned in kcal (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_kcal: Option<f64>,
    /// Total elevation gain in metres (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_gain_m: Option<f64>,
    /// Average speed in km/h (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_speed_kmh: Option<f64>,
    /// Maximum speed in km/h (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed_kmh: Option<f64>,
    /// Average heart rate in bpm (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate_bpm: Option<u16>,
    /// Maximum heart rate in bpm (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_heart_rate_bpm: Option<u16>,
    /// Ordered [lat, lng] pairs, empty when no GPS track was recorded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_coordinates: Vec<[f64; 2]>,
    /// Free-text weather descriptor (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    /// Unix seconds when the record entered the store. Store-owned.
    pub created_at: i64,
    /// Unix seconds of the last mutation. Store-owned.
    pub updated_at: i64,
}

/// Input for [`crate::ActivityStore::add`]: an activity as the caller knows
/// it, before the store assigns id and timestamps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    /// Caller-supplied id. Supplying a stable id makes retries idempotent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub sport_type: String,
    /// Occurrence time as Unix seconds
    pub date: i64,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub duration_seconds: i64,
    #[serde(default)]
    pub calories_kcal: Option<f64>,
    #[serde(default)]
    pub elevation_gain_m: Option<f64>,
    #[serde(default)]
    pub avg_speed_kmh: Option<f64>,
    #[serde(default)]
    pub max_speed_kmh: Option<f64>,
    #[serde(default)]
    pub avg_heart_rate_bpm: Option<u16>,
    #[serde(default)]
    pub max_heart_rate_bpm: Option<u16>,
    #[serde(default)]
    pub route_coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub weather: Option<String>,
}

// ============================================================================
// Achievements
// ============================================================================

/// A badge definition plus its earned state.
///
/// `progress` is only meaningful while `earned` is false. Once `earned`
/// flips to true it is never unset, and `earned_at` records the transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRecord {
    pub id: String,
    pub name: String,
    /// Human-readable unlock condition
    pub description: String,
    /// Emoji or glyph shown by the UI
    pub icon: String,
    pub earned: bool,
    /// Unix seconds of the false -> true transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<i64>,
    /// 0-100, toward the unlock condition
    #[serde(default)]
    pub progress: u8,
}

// ============================================================================
// User & Settings
// ============================================================================

/// The locally stored user profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Partial user update: set fields overwrite, unset fields are preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl UserProfile {
    /// Merge-not-replace: apply the set fields of `update` onto `self`.
    pub fn apply(&mut self, update: UserUpdate) {
        if update.name.is_some() {
            self.name = update.name;
        }
        if update.email.is_some() {
            self.email = update.email;
        }
        if update.profile_picture.is_some() {
            self.profile_picture = update.profile_picture;
        }
        if update.location.is_some() {
            self.location = update.location;
        }
        if update.bio.is_some() {
            self.bio = update.bio;
        }
    }
}

/// Weekly targets the dashboard tracks progress against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyGoals {
    /// Kilometres per week
    pub distance_km: f64,
    /// Activity count per week
    pub activities: u32,
    /// Kilocalories per week
    pub calories_kcal: f64,
    /// Active minutes per week
    pub time_minutes: u32,
}

impl Default for WeeklyGoals {
    fn default() -> Self {
        Self {
            distance_km: 25.0,
            activities: 4,
            calories_kcal: 2000.0,
            time_minutes: 300,
        }
    }
}

/// User-tunable application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: String,
    pub units: String,
    pub notifications: bool,
    pub weekly_goals: WeeklyGoals,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            units: "metric".to_string(),
            notifications: true,
            weekly_goals: WeeklyGoals::default(),
        }
    }
}

// ============================================================================
// Derived statistics
// ============================================================================

/// A derived rollup over one time window. Never hand-edited; always fully
/// recomputed from the current activities collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Number of activities in the window
    pub activities: u32,
    /// Summed distance in kilometres
    pub distance: f64,
    /// Summed duration in seconds
    pub time: i64,
    /// Summed kilocalories
    pub calories: f64,
    /// Summed elevation gain in metres
    pub elevation: f64,
}

/// The three standard windows the dashboard displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub this_week: StatsSnapshot,
    pub this_month: StatsSnapshot,
    pub all_time: StatsSnapshot,
}

// ============================================================================
// Root aggregate
// ============================================================================

/// The root persisted aggregate: everything the store owns, as one blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub user: Option<UserProfile>,
    pub activities: Vec<ActivityRecord>,
    pub achievements: Vec<AchievementRecord>,
    pub settings: Settings,
    pub stats: StatsOverview,
    /// Shape tag checked by the version guard on open
    pub schema_version: u32,
    /// Unix seconds of the last snapshot import, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_imported_at: Option<i64>,
}
