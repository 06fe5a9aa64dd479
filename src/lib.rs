//! Fittrackrs - on-device activity store and derived-statistics engine
//!
//! This crate provides:
//! - SQLite-backed persistence for the activity collection: a single JSON
//!   blob plus a schema version marker, with an ordered migration chain
//! - Pure derived-statistics calculations: windowed rollups, sport and
//!   month breakdowns, heart rate zone distributions, weekly goals
//! - Personal record detection and achievement progress evaluation
//! - A JSON snapshot gateway for backup and restore
//!
//! The store is single-writer and synchronous: every mutation re-sorts
//! the collection, recomputes the stats overview and persists before
//! returning. When the storage medium fails, the store logs once and
//! serves the rest of the session from memory.

pub mod achievements;
pub mod error;
pub mod ingest;
pub mod migrations;
pub mod persistence;
pub mod records;
pub mod snapshot;
pub mod stats;
pub mod types;

pub use achievements::{AchievementDef, AchievementRule, EvaluationOutcome, CATALOG};
pub use error::{EngineError, Result};
pub use ingest::{RawActivity, RawDate};
pub use migrations::CURRENT_SCHEMA_VERSION;
pub use persistence::ActivityStore;
pub use records::{detect_records, PersonalRecord, RecordMetric};
pub use snapshot::{ExportedSnapshot, ImportSummary};
pub use stats::{HrZoneConfig, HrZoneDistribution, WeeklyGoalProgress};
pub use types::{
    AchievementRecord, ActivityRecord, NewActivity, PersistedState, Settings, StatsOverview,
    StatsSnapshot, UserProfile, UserUpdate, WeeklyGoals,
};
