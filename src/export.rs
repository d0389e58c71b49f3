//! History export.
//!
//! Finished interviews are written as pretty JSON so that a run can be
//! replayed or audited later. Writes go through a temp file + rename.

use std::path::Path;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{Engine, HistoryEntry};
use crate::error::Result;
use crate::util::{read_to_string_with_limit, write_atomic, MAX_FILE_SIZE};

/// Current export schema version.
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// Where an interview stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalPosition {
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<String>,
    pub state: String,
    pub time: String,
}

/// One interview: how it started, every position visited, and where it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewRecord {
    /// Topic the interview was started from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Start group.
    pub start_group: String,
    /// Start state.
    pub start_state: String,
    /// Responses applied, in order.
    #[serde(default)]
    pub answers: Vec<bool>,
    /// Full history log.
    pub history: Vec<HistoryEntry>,
    /// Final position.
    pub final_position: FinalPosition,
    /// Terminal diagnosis code, when the interview reached one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    /// Error that stopped the interview early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InterviewRecord {
    /// Capture the current state of an engine.
    pub fn capture<R: Rng>(engine: &Engine<'_, R>, topic: Option<&str>, answers: &[bool]) -> Self {
        let history = engine.history().to_vec();
        let (start_group, start_state) = history
            .first()
            .map(|e| (e.group.clone(), e.state.clone()))
            .unwrap_or_else(|| {
                (
                    engine.current_group().to_string(),
                    engine.current_state().to_string(),
                )
            });

        Self {
            topic: topic.map(str::to_string),
            start_group,
            start_state,
            answers: answers.to_vec(),
            history,
            final_position: FinalPosition {
                group: engine.current_group().to_string(),
                subgroup: engine.current_subgroup().map(str::to_string),
                state: engine.current_state().to_string(),
                time: engine.current_time().to_string(),
            },
            diagnosis: None,
            error: None,
        }
    }

    /// Mark the terminal diagnosis reached.
    pub fn with_diagnosis(mut self, code: impl Into<String>) -> Self {
        self.diagnosis = Some(code.into());
        self
    }

    /// Mark the error that stopped the interview.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// A file of exported interviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryExport {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub interviews: Vec<InterviewRecord>,
}

impl Default for HistoryExport {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryExport {
    /// Create an empty export stamped with the current time.
    pub fn new() -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: Utc::now(),
            interviews: Vec::new(),
        }
    }

    /// Add an interview.
    pub fn push(&mut self, record: InterviewRecord) {
        self.interviews.push(record);
    }

    /// Number of interviews.
    pub fn len(&self) -> usize {
        self.interviews.len()
    }

    /// Check if the export holds no interviews.
    pub fn is_empty(&self) -> bool {
        self.interviews.is_empty()
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the export atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        write_atomic(path, &json)?;
        tracing::info!(path = %path.display(), interviews = self.len(), "history exported");
        Ok(())
    }

    /// Read a previously written export.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string_with_limit(path, MAX_FILE_SIZE)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleStore, Subgroup, SubgroupRegistry};
    use serde_json::json;
    use tempfile::TempDir;

    fn rules() -> RuleStore {
        RuleStore::from_values(
            &json!({"A.1": {"A1": {"N": ["A2", "time0"]}, "A2": {"N": ["A4", "time3"]}}}),
            &json!({}),
        )
        .unwrap()
    }

    fn registry() -> SubgroupRegistry {
        SubgroupRegistry::empty()
            .with_subgroup("A00", Subgroup::new(["A3"], 1, "time1", ["time0"]))
            .unwrap()
    }

    #[test]
    fn test_capture_records_start_and_end() {
        let rules = rules();
        let registry = registry();
        let mut engine = Engine::new(&rules, &registry, "A.1", "A1").unwrap();
        engine.advance(false).unwrap();
        engine.advance(false).unwrap();

        let record = InterviewRecord::capture(&engine, Some("sleep"), &[false, false]);
        assert_eq!(record.topic.as_deref(), Some("sleep"));
        assert_eq!(record.start_group, "A.1");
        assert_eq!(record.start_state, "A1");
        assert_eq!(record.history.len(), 3);
        assert_eq!(record.final_position.state, "A4");
        assert_eq!(record.final_position.time, "time3");
        assert!(record.diagnosis.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join("history.json");

        let rules = rules();
        let registry = registry();
        let mut engine = Engine::new(&rules, &registry, "A.1", "A1").unwrap();
        engine.advance(false).unwrap();

        let mut export = HistoryExport::new();
        export.push(InterviewRecord::capture(&engine, None, &[false]).with_diagnosis("A2"));
        export.save(&path).unwrap();

        let loaded = HistoryExport::load(&path).unwrap();
        assert_eq!(loaded, export);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.interviews[0].diagnosis.as_deref(), Some("A2"));

        // No temp file left behind
        assert!(!temp.path().join("out").join(".history.json.tmp").exists());
    }

    #[test]
    fn test_json_shape() {
        let rules = rules();
        let registry = registry();
        let engine = Engine::new(&rules, &registry, "A.1", "A1").unwrap();

        let mut export = HistoryExport::new();
        export.push(InterviewRecord::capture(&engine, None, &[]).with_error("boom"));
        let value: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();

        assert_eq!(value["schema_version"], EXPORT_SCHEMA_VERSION);
        assert!(value["exported_at"].is_string());
        let interview = &value["interviews"][0];
        assert!(interview.get("topic").is_none());
        assert!(interview.get("diagnosis").is_none());
        assert_eq!(interview["error"], "boom");
        assert!(interview["final_position"].get("subgroup").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(HistoryExport::load(&temp.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_empty_export() {
        let export = HistoryExport::default();
        assert!(export.is_empty());
        assert_eq!(export.schema_version, EXPORT_SCHEMA_VERSION);
    }
}
