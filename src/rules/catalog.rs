//! Interview catalog: terminal diagnosis codes and topic entry points.
//!
//! Both files are optional. A driver uses the terminal set to recognise the
//! end of an interview and the entry points to pick the first question of a
//! topic.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DiagError, Result};
use crate::util::read_rule_source;

/// Starting position for a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Group id.
    pub group: String,
    /// State id.
    pub state: String,
}

/// Terminal diagnosis codes and topic entry points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    terminals: BTreeSet<String>,
    entry_points: BTreeMap<String, EntryPoint>,
}

impl Catalog {
    /// Create a catalog from its parts.
    pub fn new<S: Into<String>>(
        terminals: impl IntoIterator<Item = S>,
        entry_points: impl IntoIterator<Item = (String, EntryPoint)>,
    ) -> Self {
        Self {
            terminals: terminals.into_iter().map(Into::into).collect(),
            entry_points: entry_points.into_iter().collect(),
        }
    }

    /// Load the catalog from files. Missing files leave that part empty.
    pub fn load_files(diagnosis_path: &Path, topic_path: &Path) -> Result<Self> {
        let terminals = match read_optional(diagnosis_path)? {
            Some(text) => parse_terminals(&text, diagnosis_path)?,
            None => BTreeSet::new(),
        };
        let entry_points = match read_optional(topic_path)? {
            Some(text) => parse_entry_points(&text, topic_path)?,
            None => BTreeMap::new(),
        };

        tracing::debug!(
            terminals = terminals.len(),
            topics = entry_points.len(),
            "loaded interview catalog"
        );

        Ok(Self {
            terminals,
            entry_points,
        })
    }

    /// Check whether a state id is a terminal diagnosis code.
    pub fn is_terminal(&self, state: &str) -> bool {
        self.terminals.contains(state)
    }

    /// Entry point for a topic.
    pub fn entry_point(&self, topic: &str) -> Option<&EntryPoint> {
        self.entry_points.get(topic)
    }

    /// Topic names in sorted order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entry_points.keys().map(String::as_str)
    }

    /// Number of terminal codes.
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match read_rule_source(path) {
        Ok(text) => Ok(Some(text)),
        Err(DiagError::ConfigMissing { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_terminals(text: &str, path: &Path) -> Result<BTreeSet<String>> {
    let source = path.display().to_string();
    let codes: Vec<String> = serde_json::from_str(text)
        .map_err(|e| DiagError::config_malformed(&source, e.to_string()))?;
    Ok(codes.into_iter().collect())
}

fn parse_entry_points(text: &str, path: &Path) -> Result<BTreeMap<String, EntryPoint>> {
    let source = path.display().to_string();
    let raw: BTreeMap<String, Value> = serde_json::from_str(text)
        .map_err(|e| DiagError::config_malformed(&source, e.to_string()))?;

    let mut entry_points = BTreeMap::new();
    for (topic, value) in raw {
        // Extra trailing items (topic labels) are allowed
        let entry = match value.as_array().map(Vec::as_slice) {
            Some([Value::String(group), Value::String(state), ..]) => EntryPoint {
                group: group.clone(),
                state: state.clone(),
            },
            _ => {
                return Err(DiagError::config_malformed(
                    &source,
                    format!("topic '{}' must map to [group, state], got {}", topic, value),
                ));
            }
        };
        entry_points.insert(topic, entry);
    }
    Ok(entry_points)
}
