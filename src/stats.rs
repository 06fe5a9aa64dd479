//! Derived-statistics calculations over the activity collection.
//!
//! Everything in this module is a pure function of `(records, now)`:
//! calling twice with identical inputs yields identical output. The store
//! recomputes the windowed overview synchronously after every mutation;
//! the categorical breakdowns are recomputed on read and never persisted.

use std::collections::{BTreeMap, HashMap};

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::types::{ActivityRecord, StatsOverview, StatsSnapshot, WeeklyGoals};

/// Window widths in seconds.
const WEEK_SECS: i64 = 7 * 86_400;
const MONTH_SECS: i64 = 30 * 86_400;

// ============================================================================
// Windowed rollups
// ============================================================================

/// Compute the this-week / this-month / all-time overview.
///
/// Windows are inclusive of their lower bound and open-ended above, so an
/// activity stamped exactly `now` is always counted. The three views are
/// non-exclusive: a record from yesterday lands in all of them.
pub fn recompute(records: &[ActivityRecord], now: i64) -> StatsOverview {
    let week_start = now - WEEK_SECS;
    let month_start = now - MONTH_SECS;

    let mut overview = StatsOverview::default();
    for record in records {
        accumulate(&mut overview.all_time, record);
        if record.date >= month_start {
            accumulate(&mut overview.this_month, record);
        }
        if record.date >= week_start {
            accumulate(&mut overview.this_week, record);
        }
    }
    overview
}

fn accumulate(snapshot: &mut StatsSnapshot, record: &ActivityRecord) {
    snapshot.activities += 1;
    snapshot.distance += record.distance_km;
    snapshot.time += record.duration_seconds;
    snapshot.calories += record.calories_kcal.unwrap_or(0.0);
    snapshot.elevation += record.elevation_gain_m.unwrap_or(0.0);
}

// ============================================================================
// Categorical breakdowns
// ============================================================================

/// Count activities per sport type.
pub fn sport_breakdown(records: &[ActivityRecord]) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(record.sport_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Sum distance per calendar month, keyed "YYYY-MM" so iteration order is
/// chronological.
pub fn monthly_distance(records: &[ActivityRecord]) -> BTreeMap<String, f64> {
    let mut buckets = BTreeMap::new();
    for record in records {
        let Some(ts) = DateTime::from_timestamp(record.date, 0) else {
            continue;
        };
        let label = ts.format("%Y-%m").to_string();
        *buckets.entry(label).or_insert(0.0) += record.distance_km;
    }
    buckets
}

// ============================================================================
// Heart rate zones
// ============================================================================

/// Heart rate zone configuration: five ascending upper boundaries in bpm.
/// A sample lands in the first zone whose boundary it is strictly below;
/// zone 5 also catches everything at or above the last boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrZoneConfig {
    /// Upper boundaries for zones 1-5
    pub boundaries: [u16; 5],
}

impl HrZoneConfig {
    /// Standard 5-zone model from maximum heart rate (60/70/80/90/100%).
    pub fn from_max_hr(max_hr: u16) -> Self {
        let pct = [0.60, 0.70, 0.80, 0.90, 1.00];
        let mut boundaries = [0u16; 5];
        for (i, p) in pct.iter().enumerate() {
            boundaries[i] = (max_hr as f64 * p) as u16;
        }
        Self { boundaries }
    }

    /// Explicit boundaries.
    pub fn with_boundaries(boundaries: [u16; 5]) -> Self {
        Self { boundaries }
    }

    /// Determine which zone a sample falls into (1-5).
    pub fn get_zone(&self, hr: u16) -> u8 {
        for (i, &boundary) in self.boundaries.iter().enumerate() {
            if hr < boundary {
                return (i + 1) as u8;
            }
        }
        5
    }
}

impl Default for HrZoneConfig {
    fn default() -> Self {
        Self::from_max_hr(185)
    }
}

/// Result of heart rate zone distribution calculation.
///
/// Percentages are rounded to the nearest integer per zone independently,
/// so they are not guaranteed to sum to exactly 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrZoneDistribution {
    /// Total samples analyzed
    pub total_samples: u32,
    /// Samples in each zone (indexed 0-4 for zones 1-5)
    pub zone_samples: [u32; 5],
    /// Percentage of samples in each zone
    pub zone_percentages: [u32; 5],
    /// Average heart rate across all samples
    pub average_hr: f64,
    /// Peak heart rate
    pub peak_hr: u16,
}

impl HrZoneDistribution {
    /// Get the percentage for a specific zone (1-5).
    pub fn get_zone_percent(&self, zone: u8) -> u32 {
        if (1..=5).contains(&zone) {
            self.zone_percentages[(zone - 1) as usize]
        } else {
            0
        }
    }
}

/// Bucket a heart rate time series into the five zones.
pub fn hr_zone_distribution(samples: &[u16], config: &HrZoneConfig) -> HrZoneDistribution {
    if samples.is_empty() {
        return HrZoneDistribution {
            total_samples: 0,
            zone_samples: [0; 5],
            zone_percentages: [0; 5],
            average_hr: 0.0,
            peak_hr: 0,
        };
    }

    let mut zone_samples = [0u32; 5];
    let mut sum: u64 = 0;
    let mut peak: u16 = 0;

    for &hr in samples {
        let zone = config.get_zone(hr);
        zone_samples[(zone - 1) as usize] += 1;
        sum += hr as u64;
        if hr > peak {
            peak = hr;
        }
    }

    let total = samples.len() as u32;
    let mut zone_percentages = [0u32; 5];
    for i in 0..5 {
        zone_percentages[i] = ((zone_samples[i] as f64 / total as f64) * 100.0).round() as u32;
    }

    HrZoneDistribution {
        total_samples: total,
        zone_samples,
        zone_percentages,
        average_hr: sum as f64 / total as f64,
        peak_hr: peak,
    }
}

// ============================================================================
// Weekly goals
// ============================================================================

/// Progress toward each weekly goal, as percentages capped at 100.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyGoalProgress {
    pub distance: u8,
    pub activities: u8,
    pub calories: u8,
    pub time: u8,
}

/// Compare the this-week snapshot against the configured weekly goals.
pub fn weekly_goal_progress(this_week: &StatsSnapshot, goals: &WeeklyGoals) -> WeeklyGoalProgress {
    WeeklyGoalProgress {
        distance: percent_of(this_week.distance, goals.distance_km),
        activities: percent_of(this_week.activities as f64, goals.activities as f64),
        calories: percent_of(this_week.calories, goals.calories_kcal),
        time: percent_of(this_week.time as f64 / 60.0, goals.time_minutes as f64),
    }
}

fn percent_of(current: f64, target: f64) -> u8 {
    if target <= 0.0 {
        return 100;
    }
    ((current / target * 100.0).round() as u64).min(100) as u8
}
