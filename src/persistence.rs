//! SQLite-backed activity store.
//!
//! The store owns the persisted root aggregate as a single JSON blob in a
//! key-value table, next to a schema version marker. Every mutation
//! re-sorts the collection, recomputes the windowed stats overview and
//! rewrites the blob before returning.
//!
//! The store never fails to open: when the medium cannot be read or
//! written it logs once and keeps serving the session from in-memory
//! state only (`is_degraded` reports the condition).

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};

use crate::achievements;
use crate::error::{EngineError, Result};
use crate::ingest::RawActivity;
use crate::migrations::{self, CURRENT_SCHEMA_VERSION};
use crate::records::{detect_records, PersonalRecord};
use crate::stats::{self, WeeklyGoalProgress};
use crate::types::{
    AchievementRecord, ActivityRecord, NewActivity, PersistedState, Settings, StatsOverview,
    UserProfile, UserUpdate,
};

const STATE_KEY: &str = "state";
const VERSION_KEY: &str = "schema_version";

const UPSERT: &str =
    "INSERT INTO store (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value";

/// Single-writer store over the persisted activity collection.
pub struct ActivityStore {
    /// None once the medium has failed; the session continues in memory.
    conn: Option<Connection>,
    pub(crate) state: PersistedState,
    degraded: bool,
    /// Process-local tiebreaker appended to generated ids.
    id_counter: u64,
}

impl ActivityStore {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open the store at the given database path.
    ///
    /// Never fails: an unreadable medium degrades to in-memory state, an
    /// unreadable or incompatible blob resets to the default shape.
    pub fn open(path: &str) -> Self {
        Self::open_with(Connection::open(path))
    }

    /// In-memory database (for testing and scratch sessions).
    pub fn in_memory() -> Self {
        Self::open_with(Connection::open_in_memory())
    }

    fn open_with(conn: rusqlite::Result<Connection>) -> Self {
        let mut store = Self {
            conn: None,
            state: Self::default_state(),
            degraded: false,
            id_counter: 0,
        };

        let loaded = conn.and_then(|conn| {
            Self::init_schema(&conn)?;
            let state = Self::load_state(&conn)?;
            Ok((conn, state))
        });

        match loaded {
            Ok((conn, mut state)) => {
                state.schema_version = CURRENT_SCHEMA_VERSION;
                state.activities.sort_by(|a, b| b.date.cmp(&a.date));
                state.stats = stats::recompute(&state.activities, now_unix());
                store.conn = Some(conn);
                store.state = state;
                store.persist();
            }
            Err(e) => {
                warn!(
                    "[ActivityStore] storage unavailable, continuing with in-memory state: {}",
                    e
                );
                store.degraded = true;
            }
        }
        store
    }

    /// Rewrite the persisted blob.
    ///
    /// Reports `StorageUnavailable` when the session is running without a
    /// working medium; the state itself is always current in memory.
    pub fn flush(&mut self) -> Result<()> {
        self.persist();
        if self.degraded {
            return Err(EngineError::StorageUnavailable(
                "persistence medium is offline for this session".to_string(),
            ));
        }
        Ok(())
    }

    /// Flush and drop the database connection.
    pub fn close(mut self) {
        self.persist();
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!("[ActivityStore] error closing database: {}", e);
            }
        }
    }

    /// True when the medium failed and the session is memory-only.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Restore the default empty shape, keeping the version marker current.
    pub fn reset(&mut self) {
        self.state = Self::default_state();
        self.persist();
        info!("[ActivityStore] state reset to the default shape");
    }

    // ========================================================================
    // Schema / version guard
    // ========================================================================

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
    }

    /// Resolve the persisted blob against the version marker.
    ///
    /// Missing blob or marker starts from the default shape. A known older
    /// version is migrated; unknown, newer or unparseable payloads reset.
    fn load_state(conn: &Connection) -> rusqlite::Result<PersistedState> {
        let marker = Self::read_entry(conn, VERSION_KEY)?;
        let blob = Self::read_entry(conn, STATE_KEY)?;

        let (marker, blob) = match (marker, blob) {
            (Some(marker), Some(blob)) => (marker, blob),
            _ => {
                info!("[ActivityStore] no persisted state, starting from the default shape");
                return Ok(Self::default_state());
            }
        };

        let stored: u32 = match marker.parse() {
            Ok(version) => version,
            Err(_) => {
                warn!(
                    "[ActivityStore] unreadable version marker '{}', resetting",
                    marker
                );
                return Ok(Self::default_state());
            }
        };

        if stored == CURRENT_SCHEMA_VERSION {
            return match serde_json::from_str(&blob) {
                Ok(state) => Ok(state),
                Err(e) => {
                    warn!("[ActivityStore] unparseable persisted state, resetting: {}", e);
                    Ok(Self::default_state())
                }
            };
        }

        if stored < CURRENT_SCHEMA_VERSION {
            let migrated = serde_json::from_str(&blob)
                .map_err(|e| e.to_string())
                .and_then(|value| migrations::run_chain(stored, value))
                .and_then(|value| {
                    serde_json::from_value::<PersistedState>(value).map_err(|e| e.to_string())
                });
            return match migrated {
                Ok(state) => {
                    info!(
                        "[ActivityStore] migrated persisted state v{} -> v{}",
                        stored, CURRENT_SCHEMA_VERSION
                    );
                    Ok(state)
                }
                Err(e) => {
                    warn!("[ActivityStore] migration from v{} failed, resetting: {}", stored, e);
                    Ok(Self::default_state())
                }
            };
        }

        warn!(
            "[ActivityStore] stored version v{} is newer than supported v{}, resetting",
            stored, CURRENT_SCHEMA_VERSION
        );
        Ok(Self::default_state())
    }

    fn read_entry(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
    }

    fn default_state() -> PersistedState {
        PersistedState {
            schema_version: CURRENT_SCHEMA_VERSION,
            ..PersistedState::default()
        }
    }

    /// Write the blob and version marker. On a write fault the store logs
    /// once, drops the connection and serves the rest of the session from
    /// memory.
    pub(crate) fn persist(&mut self) {
        let Some(conn) = self.conn.as_ref() else {
            return;
        };
        let blob = match serde_json::to_string(&self.state) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("[ActivityStore] could not serialize state: {}", e);
                return;
            }
        };
        let written = conn
            .execute(UPSERT, params![STATE_KEY, blob])
            .and_then(|_| {
                conn.execute(
                    UPSERT,
                    params![VERSION_KEY, self.state.schema_version.to_string()],
                )
            });
        if let Err(e) = written {
            warn!(
                "[ActivityStore] write failed, continuing with in-memory state: {}",
                e
            );
            self.conn = None;
            self.degraded = true;
        }
    }

    // ========================================================================
    // Activity CRUD
    // ========================================================================

    /// The current collection, sorted by date descending.
    pub fn activities(&self) -> &[ActivityRecord] {
        &self.state.activities
    }

    /// Insert a new activity: assign id and timestamps, coerce negative
    /// numerics, re-sort, recompute stats and persist.
    ///
    /// A retried add with the same caller-supplied id replaces the earlier
    /// entry instead of duplicating it.
    pub fn add(&mut self, new: NewActivity) -> ActivityRecord {
        let record = self.build_record(new, now_unix());
        self.insert_record(record.clone());
        self.resort();
        self.recompute_stats();
        self.persist();
        record
    }

    /// Replace the entry with the same id in place.
    ///
    /// `created_at` stays store-owned; `updated_at` is refreshed. Fails
    /// with `NotFound` when the id is not in the collection.
    pub fn update(&mut self, mut record: ActivityRecord) -> Result<ActivityRecord> {
        record.distance_km = record.distance_km.max(0.0);
        record.duration_seconds = record.duration_seconds.max(0);
        record.updated_at = now_unix();

        let Some(existing) = self
            .state
            .activities
            .iter_mut()
            .find(|a| a.id == record.id)
        else {
            return Err(EngineError::NotFound { id: record.id });
        };
        record.created_at = existing.created_at;
        *existing = record.clone();

        self.resort();
        self.recompute_stats();
        self.persist();
        Ok(record)
    }

    /// Remove the entry with the given id, reporting whether one was
    /// removed. Stats are recomputed and persisted either way so the
    /// recomputation stays deterministic.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.state.activities.len();
        self.state.activities.retain(|a| a.id != id);
        let removed = self.state.activities.len() != before;

        self.recompute_stats();
        self.persist();
        removed
    }

    /// Normalize and insert a batch of producer records in one pass: one
    /// re-sort, one recompute, one write. Records missing the required
    /// name/sport/date trio are skipped. Returns how many were inserted.
    pub fn ingest_batch(&mut self, raw: &[RawActivity]) -> usize {
        let now = now_unix();
        let mut added = 0usize;
        for entry in raw {
            let Some(new) = entry.normalize() else {
                continue;
            };
            let record = self.build_record(new, now);
            self.insert_record(record);
            added += 1;
        }
        if added < raw.len() {
            info!(
                "[ActivityStore] ingest skipped {} of {} record(s)",
                raw.len() - added,
                raw.len()
            );
        }
        if added > 0 {
            self.resort();
            self.recompute_stats();
            self.persist();
        }
        added
    }

    fn build_record(&mut self, new: NewActivity, now: i64) -> ActivityRecord {
        ActivityRecord {
            id: new
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| self.next_id()),
            name: new.name,
            sport_type: new.sport_type,
            date: new.date,
            distance_km: new.distance_km.max(0.0),
            duration_seconds: new.duration_seconds.max(0),
            calories_kcal: new.calories_kcal.filter(|v| *v >= 0.0),
            elevation_gain_m: new.elevation_gain_m.filter(|v| *v >= 0.0),
            avg_speed_kmh: new.avg_speed_kmh,
            max_speed_kmh: new.max_speed_kmh,
            avg_heart_rate_bpm: new.avg_heart_rate_bpm,
            max_heart_rate_bpm: new.max_heart_rate_bpm,
            route_coordinates: new.route_coordinates,
            weather: new.weather,
            created_at: now,
            updated_at: now,
        }
    }

    fn insert_record(&mut self, record: ActivityRecord) {
        self.state.activities.retain(|a| a.id != record.id);
        self.state.activities.push(record);
    }

    /// Millisecond timestamp plus a process-local counter: monotonically
    /// distinguishable within one session.
    fn next_id(&mut self) -> String {
        self.id_counter += 1;
        format!("{}-{}", now_millis(), self.id_counter)
    }

    pub(crate) fn resort(&mut self) {
        self.state.activities.sort_by(|a, b| b.date.cmp(&a.date));
    }

    pub(crate) fn recompute_stats(&mut self) {
        self.state.stats = stats::recompute(&self.state.activities, now_unix());
    }

    // ========================================================================
    // User & settings
    // ========================================================================

    pub fn user(&self) -> Option<&UserProfile> {
        self.state.user.as_ref()
    }

    /// Merge-not-replace: supplied fields overwrite, unspecified fields
    /// are preserved.
    pub fn set_user(&mut self, update: UserUpdate) {
        let mut user = self.state.user.take().unwrap_or_default();
        user.apply(update);
        self.state.user = Some(user);
        self.persist();
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    /// The persisted windowed overview, recomputed on every mutation.
    pub fn stats(&self) -> &StatsOverview {
        &self.state.stats
    }

    /// Personal records over the full collection, recomputed per read.
    pub fn personal_records(&self) -> Vec<PersonalRecord> {
        detect_records(&self.state.activities)
    }

    pub fn sport_breakdown(&self) -> HashMap<String, u32> {
        stats::sport_breakdown(&self.state.activities)
    }

    pub fn monthly_distance(&self) -> BTreeMap<String, f64> {
        stats::monthly_distance(&self.state.activities)
    }

    pub fn weekly_goal_progress(&self) -> WeeklyGoalProgress {
        stats::weekly_goal_progress(&self.state.stats.this_week, &self.state.settings.weekly_goals)
    }

    // ========================================================================
    // Achievements
    // ========================================================================

    pub fn achievements(&self) -> &[AchievementRecord] {
        &self.state.achievements
    }

    /// Re-evaluate achievement progress against the current record set.
    ///
    /// Seeds catalog entries missing from the store, updates progress on
    /// unearned entries and persists earned transitions. This is the only
    /// store mutation the evaluator performs.
    pub fn evaluate_achievements(&mut self) -> &[AchievementRecord] {
        let outcome =
            achievements::evaluate(&self.state.achievements, &self.state.activities, now_unix());
        if outcome.achievements != self.state.achievements {
            if outcome.newly_earned > 0 {
                info!(
                    "[ActivityStore] {} achievement(s) newly earned",
                    outcome.newly_earned
                );
            }
            self.state.achievements = outcome.achievements;
            self.persist();
        }
        &self.state.achievements
    }
}

pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
