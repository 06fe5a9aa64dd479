//! Snapshot import/export gateway.
//!
//! Export returns a deep serializable copy of the full persisted state.
//! Import merges settings field by field (imported values win), replaces
//! the collections wholesale when present and stamps the import time.
//! Individual malformed or duplicate activity records are skipped and
//! counted rather than failing the import; only a non-object payload is
//! rejected wholesale.

use std::collections::HashSet;

use chrono::DateTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::persistence::{now_unix, ActivityStore};
use crate::types::{AchievementRecord, ActivityRecord, PersistedState, UserProfile};

/// The export document: the persisted state plus the export time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSnapshot {
    #[serde(flatten)]
    pub state: PersistedState,
    /// Unix seconds when the snapshot was taken
    pub exported_at: i64,
}

/// What an import actually took in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Activity records accepted
    pub activities: usize,
    /// Achievement entries accepted
    pub achievements: usize,
    /// Activity entries skipped: malformed or duplicate id
    pub skipped_activities: usize,
}

impl ActivityStore {
    /// A deep, serializable copy of the full persisted state. Holds no
    /// references into live state.
    pub fn export_snapshot(&self) -> ExportedSnapshot {
        ExportedSnapshot {
            state: self.state.clone(),
            exported_at: now_unix(),
        }
    }

    /// Conventional backup filename embedding the export date.
    pub fn export_file_name(now: i64) -> String {
        let date = DateTime::from_timestamp(now, 0)
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown-date".to_string());
        format!("fittracker-export-{}.json", date)
    }

    /// Restore from a snapshot document.
    ///
    /// Fails with `InvalidFormat` when the payload is not a JSON object.
    /// Otherwise best-effort: settings merge field by field with imported
    /// values winning, `activities`/`achievements`/`user` replace the
    /// stored collections when present, and entries that cannot be parsed
    /// (or repeat an id) are skipped and reported in the summary.
    pub fn import_snapshot(&mut self, data: &Value) -> Result<ImportSummary> {
        let Some(payload) = data.as_object() else {
            return Err(EngineError::InvalidFormat(
                "import payload must be a JSON object".to_string(),
            ));
        };

        let mut summary = ImportSummary::default();

        if let Some(settings) = payload.get("settings") {
            self.merge_settings(settings);
        }

        if let Some(user) = payload.get("user") {
            match serde_json::from_value::<Option<UserProfile>>(user.clone()) {
                Ok(user) => self.state.user = user,
                Err(e) => warn!("[Snapshot] ignoring malformed user object: {}", e),
            }
        }

        if let Some(entries) = payload.get("activities").and_then(Value::as_array) {
            let mut imported = Vec::with_capacity(entries.len());
            let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
            for entry in entries {
                match serde_json::from_value::<ActivityRecord>(entry.clone()) {
                    Ok(record) => {
                        if seen.insert(record.id.clone()) {
                            imported.push(record);
                        } else {
                            warn!("[Snapshot] skipping duplicate activity id '{}'", record.id);
                            summary.skipped_activities += 1;
                        }
                    }
                    Err(e) => {
                        warn!("[Snapshot] skipping malformed activity record: {}", e);
                        summary.skipped_activities += 1;
                    }
                }
            }
            summary.activities = imported.len();
            self.state.activities = imported;
        }

        if let Some(entries) = payload.get("achievements").and_then(Value::as_array) {
            let imported: Vec<AchievementRecord> = entries
                .iter()
                .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("[Snapshot] skipping malformed achievement entry: {}", e);
                        None
                    }
                })
                .collect();
            summary.achievements = imported.len();
            self.state.achievements = imported;
        }

        self.state.last_imported_at = Some(now_unix());
        self.resort();
        self.recompute_stats();
        self.persist();

        info!(
            "[Snapshot] import complete: {} activities ({} skipped), {} achievements",
            summary.activities, summary.skipped_activities, summary.achievements
        );
        Ok(summary)
    }

    /// Field-by-field settings merge at the JSON level: keys present in
    /// the import overwrite, everything else keeps its stored value.
    fn merge_settings(&mut self, incoming: &Value) {
        let Some(incoming) = incoming.as_object() else {
            warn!("[Snapshot] ignoring non-object settings in import");
            return;
        };
        let mut merged = match serde_json::to_value(&self.state.settings) {
            Ok(Value::Object(map)) => map,
            _ => return,
        };
        for (key, value) in incoming {
            merged.insert(key.clone(), value.clone());
        }
        match serde_json::from_value(Value::Object(merged)) {
            Ok(settings) => self.state.settings = settings,
            Err(e) => warn!("[Snapshot] ignoring unmergeable settings in import: {}", e),
        }
    }
}
