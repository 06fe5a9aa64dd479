//! Personal record (PR) detection.
//!
//! Scans the full record set and reports the best value per tracked metric,
//! scoped per sport. The output is derived and never persisted: it is
//! recomputed on every invocation, which is cheap at user-data scale.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::ActivityRecord;

/// Metric a personal record is tracked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordMetric {
    /// Longest single-activity distance (km)
    LongestDistance,
    /// Fastest pace over any distance-bearing activity (min/km, lower wins)
    FastestPace,
    /// Most elevation gain in a single activity (m)
    MostElevation,
    /// Most calories burned in a single activity (kcal)
    MostCalories,
    /// Longest single-activity duration (seconds)
    LongestDuration,
}

impl RecordMetric {
    const ALL: [RecordMetric; 5] = [
        RecordMetric::LongestDistance,
        RecordMetric::FastestPace,
        RecordMetric::MostElevation,
        RecordMetric::MostCalories,
        RecordMetric::LongestDuration,
    ];

    /// Display unit for the metric's value.
    pub fn unit(&self) -> &'static str {
        match self {
            RecordMetric::LongestDistance => "km",
            RecordMetric::FastestPace => "min/km",
            RecordMetric::MostElevation => "m",
            RecordMetric::MostCalories => "kcal",
            RecordMetric::LongestDuration => "s",
        }
    }

    /// Lower values win for pace; everything else is a maximum.
    fn lower_is_better(&self) -> bool {
        matches!(self, RecordMetric::FastestPace)
    }
}

/// The holder of one personal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
    pub metric: RecordMetric,
    pub sport_type: String,
    /// Best value in the metric's unit
    pub value: f64,
    pub unit: String,
    /// Activity that holds the record
    pub activity_id: String,
    pub activity_name: String,
    /// Occurrence time of the holding activity (Unix seconds)
    pub date: i64,
}

/// Extract the qualifying value for a metric, or None if the activity
/// does not qualify (no distance for pace records, no data for optionals).
fn metric_value(metric: RecordMetric, record: &ActivityRecord) -> Option<f64> {
    match metric {
        RecordMetric::LongestDistance => {
            (record.distance_km > 0.0).then_some(record.distance_km)
        }
        RecordMetric::FastestPace => {
            if record.distance_km > 0.0 && record.duration_seconds > 0 {
                Some(record.duration_seconds as f64 / 60.0 / record.distance_km)
            } else {
                None
            }
        }
        RecordMetric::MostElevation => record.elevation_gain_m.filter(|&e| e > 0.0),
        RecordMetric::MostCalories => record.calories_kcal.filter(|&c| c > 0.0),
        RecordMetric::LongestDuration => {
            (record.duration_seconds > 0).then_some(record.duration_seconds as f64)
        }
    }
}

/// Detect all personal records over the full record set.
///
/// One entry per (sport, metric) pair that has at least one qualifying
/// activity. Ties break toward the most recent `date`. Sports iterate in
/// sorted order so the output is deterministic for identical input.
pub fn detect_records(records: &[ActivityRecord]) -> Vec<PersonalRecord> {
    let sports: BTreeSet<&str> = records.iter().map(|r| r.sport_type.as_str()).collect();

    let mut results = Vec::new();
    for sport in sports {
        for metric in RecordMetric::ALL {
            let mut best: Option<(&ActivityRecord, f64)> = None;
            for record in records.iter().filter(|r| r.sport_type == sport) {
                let Some(value) = metric_value(metric, record) else {
                    continue;
                };
                let beats = match &best {
                    None => true,
                    Some((holder, best_value)) => {
                        let better = if metric.lower_is_better() {
                            value < *best_value
                        } else {
                            value > *best_value
                        };
                        better || (value == *best_value && record.date > holder.date)
                    }
                };
                if beats {
                    best = Some((record, value));
                }
            }
            if let Some((holder, value)) = best {
                results.push(PersonalRecord {
                    metric,
                    sport_type: sport.to_string(),
                    value,
                    unit: metric.unit().to_string(),
                    activity_id: holder.id.clone(),
                    activity_name: holder.name.clone(),
                    date: holder.date,
                });
            }
        }
    }
    results
}
