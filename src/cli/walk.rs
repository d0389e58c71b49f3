//! Walk command for diagtree.
//!
//! Drives one interview with scripted answers, printing the snapshot after
//! every transition. The walk stops early when a terminal diagnosis code is
//! reached or when a transition is rejected.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::core::{Engine, StateSnapshot};
use crate::error::{DiagError, Result};
use crate::export::{HistoryExport, InterviewRecord};
use crate::rules::{Catalog, RuleStore, SubgroupRegistry};

/// Parse one scripted answer.
///
/// Accepts `y`/`yes`/`true`/`1` and `n`/`no`/`false`/`0`, case-insensitive.
pub fn parse_answer(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(true),
        "n" | "no" | "false" | "0" => Ok(false),
        other => Err(format!("invalid answer '{}' (expected y or n)", other)),
    }
}

/// Where the interview starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStart {
    /// An explicit group and state.
    Position { group: String, state: String },
    /// A topic looked up in the catalog.
    Topic(String),
}

/// Options for the walk command.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Starting point.
    pub start: WalkStart,
    /// Answers applied in order.
    pub answers: Vec<bool>,
    /// Write the history to this file when the walk ends.
    pub export: Option<PathBuf>,
}

impl WalkOptions {
    /// Create options for a walk from `start` with no answers.
    pub fn new(start: WalkStart) -> Self {
        Self {
            json: false,
            quiet: false,
            start,
            answers: Vec::new(),
            export: None,
        }
    }
}

/// One transition of the walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkStep {
    /// Answer applied; absent for the starting snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<bool>,
    /// Snapshot after the transition.
    pub snapshot: StateSnapshot,
}

/// Output format for the walk command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkOutput {
    /// Whether the walk ran without a rejected transition.
    pub success: bool,
    /// Topic, when started from one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Starting snapshot followed by one entry per applied answer.
    pub steps: Vec<WalkStep>,
    /// Number of answers applied.
    pub answers_used: usize,
    /// Terminal diagnosis code reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    /// Export file written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_to: Option<String>,
    /// Whether the failure came from the rule tables.
    #[serde(default)]
    pub rule_error: bool,
    /// Error message if the walk failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WalkOutput {
    /// Create a failed output from an error.
    pub fn failure(error: &DiagError) -> Self {
        Self {
            success: false,
            rule_error: error.is_rule_error(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Final snapshot, if the walk started at all.
    pub fn last_snapshot(&self) -> Option<&StateSnapshot> {
        self.steps.last().map(|s| &s.snapshot)
    }

    /// Format according to the output options.
    pub fn render(&self, options: &WalkOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_text()
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        let mut lines = Vec::new();

        if let Some(topic) = &self.topic {
            lines.push(format!("Topic: {}", topic));
        }

        for step in &self.steps {
            let s = &step.snapshot;
            let answer = match step.answer {
                Some(true) => "y",
                Some(false) => "n",
                None => "-",
            };
            let position = match &s.current_subgroup {
                Some(subgroup) => format!("{}/{}/{}", s.current_group, subgroup, s.current_state),
                None => format!("{}/{}", s.current_group, s.current_state),
            };
            let progress = if s.in_subgroup() {
                format!("  ({})", s.substate_progress)
            } else {
                String::new()
            };
            lines.push(format!(
                "{}  {:<24} {}{}",
                answer, position, s.current_time, progress
            ));
        }

        if let Some(code) = &self.diagnosis {
            lines.push(format!("Reached diagnosis {}", code));
        }
        if let Some(path) = &self.exported_to {
            lines.push(format!("History written to {}", path));
        }
        if let Some(error) = &self.error {
            lines.push(format!("Walk failed: {}", error));
        }

        lines.join("\n")
    }
}

/// The walk command implementation.
pub struct WalkCommand<'a> {
    rules: &'a RuleStore,
    registry: &'a SubgroupRegistry,
    catalog: &'a Catalog,
    engine: EngineConfig,
}

impl<'a> WalkCommand<'a> {
    /// Create a new walk command.
    pub fn new(
        rules: &'a RuleStore,
        registry: &'a SubgroupRegistry,
        catalog: &'a Catalog,
        engine: EngineConfig,
    ) -> Self {
        Self {
            rules,
            registry,
            catalog,
            engine,
        }
    }

    /// Run the walk command.
    pub fn run(&self, options: &WalkOptions) -> WalkOutput {
        let (topic, group, state) = match self.resolve_start(&options.start) {
            Ok(start) => start,
            Err(e) => return WalkOutput::failure(&e),
        };

        let mut engine =
            match Engine::with_config(self.rules, self.registry, &self.engine, group, state) {
                Ok(engine) => engine,
                Err(e) => return WalkOutput::failure(&e),
            };

        let mut output = WalkOutput {
            success: true,
            topic: topic.clone(),
            steps: vec![WalkStep {
                answer: None,
                snapshot: engine.snapshot(),
            }],
            ..Default::default()
        };

        let mut failure = None;
        for &answer in &options.answers {
            if self.terminal_reached(&engine) {
                break;
            }
            match engine.advance(answer) {
                Ok(snapshot) => {
                    output.answers_used += 1;
                    output.steps.push(WalkStep {
                        answer: Some(answer),
                        snapshot,
                    });
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if self.terminal_reached(&engine) {
            output.diagnosis = Some(engine.current_state().to_string());
        }

        let mut record = InterviewRecord::capture(
            &engine,
            topic.as_deref(),
            &options.answers[..output.answers_used],
        );
        if let Some(code) = &output.diagnosis {
            record = record.with_diagnosis(code.clone());
        }

        if let Some(e) = failure {
            output.success = false;
            output.rule_error = e.is_rule_error();
            output.error = Some(e.to_string());
            record = record.with_error(e.to_string());
        }

        if let Some(path) = &options.export {
            let mut export = HistoryExport::new();
            export.push(record);
            match export.save(path) {
                Ok(()) => output.exported_to = Some(path.display().to_string()),
                Err(e) => {
                    output.success = false;
                    output.error = Some(match output.error.take() {
                        Some(previous) => format!("{}; export failed: {}", previous, e),
                        None => format!("export failed: {}", e),
                    });
                }
            }
        }

        output
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &WalkOutput, options: &WalkOptions) -> String {
        output.render(options)
    }

    fn resolve_start(&self, start: &WalkStart) -> Result<(Option<String>, String, String)> {
        match start {
            WalkStart::Position { group, state } => Ok((None, group.clone(), state.clone())),
            WalkStart::Topic(topic) => {
                let entry = self.catalog.entry_point(topic).ok_or_else(|| {
                    DiagError::config(format!("unknown topic '{}'", topic))
                })?;
                Ok((Some(topic.clone()), entry.group.clone(), entry.state.clone()))
            }
        }
    }

    fn terminal_reached(&self, engine: &Engine<'_>) -> bool {
        !engine.is_in_subgroup() && self.catalog.is_terminal(engine.current_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{EntryPoint, Subgroup};
    use serde_json::json;
    use tempfile::TempDir;

    fn rules() -> RuleStore {
        RuleStore::from_values(
            &json!({
                "A.1": {
                    "A1": {"N": ["A2", "time0"], "Y": ["A00", "time1"]},
                    "A2": {"N": ["A4", "time0"], "Y": ["depression1", "time0"]},
                    "A00": {"Y": ["depression2", "time0"], "N": ["A2", "time0"]}
                },
                "B.1": {"B1": {"Y": ["anxiety1", "time0"]}}
            }),
            &json!({"A.1:A4": ["B.1", "B1", "time2"]}),
        )
        .unwrap()
    }

    fn registry() -> SubgroupRegistry {
        SubgroupRegistry::empty()
            .with_subgroup("A00", Subgroup::new(["A3", "A6"], 1, "time1", ["time0"]))
            .unwrap()
    }

    fn catalog() -> Catalog {
        Catalog::new(
            ["depression1", "depression2", "anxiety1"],
            [(
                "mood".to_string(),
                EntryPoint {
                    group: "A.1".to_string(),
                    state: "A1".to_string(),
                },
            )],
        )
    }

    fn seeded() -> EngineConfig {
        EngineConfig {
            seed: Some(7),
            ..Default::default()
        }
    }

    fn position(group: &str, state: &str) -> WalkStart {
        WalkStart::Position {
            group: group.to_string(),
            state: state.to_string(),
        }
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y"), Ok(true));
        assert_eq!(parse_answer("YES"), Ok(true));
        assert_eq!(parse_answer(" 1 "), Ok(true));
        assert_eq!(parse_answer("n"), Ok(false));
        assert_eq!(parse_answer("False"), Ok(false));
        assert!(parse_answer("maybe").is_err());
        assert!(parse_answer("").is_err());
    }

    #[test]
    fn test_options_carry_explicit_start() {
        let options = WalkOptions::new(position("A.1", "A1"));
        assert_eq!(options.start, position("A.1", "A1"));
        assert!(options.answers.is_empty());
        assert!(options.export.is_none());
        assert!(!options.json && !options.quiet);
    }

    #[test]
    fn test_walk_to_diagnosis() {
        let (rules, registry, catalog) = (rules(), registry(), catalog());
        let cmd = WalkCommand::new(&rules, &registry, &catalog, seeded());
        let options = WalkOptions {
            answers: vec![false, true, true, true],
            ..WalkOptions::new(position("A.1", "A1"))
        };

        let output = cmd.run(&options);
        assert!(output.success);
        assert_eq!(output.diagnosis.as_deref(), Some("depression1"));
        // Stops as soon as the diagnosis is reached
        assert_eq!(output.answers_used, 2);
        assert_eq!(output.steps.len(), 3);
        assert!(output.steps[0].answer.is_none());
    }

    #[test]
    fn test_walk_from_topic() {
        let (rules, registry, catalog) = (rules(), registry(), catalog());
        let cmd = WalkCommand::new(&rules, &registry, &catalog, seeded());
        let options = WalkOptions {
            answers: vec![false, false, true, true],
            ..WalkOptions::new(WalkStart::Topic("mood".to_string()))
        };

        let output = cmd.run(&options);
        assert!(output.success);
        assert_eq!(output.topic.as_deref(), Some("mood"));
        // A1 -> A2 -> A4 -> (cross) B.1/B1 -> anxiety1
        assert_eq!(output.diagnosis.as_deref(), Some("anxiety1"));
        let last = output.last_snapshot().unwrap();
        assert_eq!(last.current_group, "B.1");
    }

    #[test]
    fn test_walk_through_subgroup() {
        let (rules, registry, catalog) = (rules(), registry(), catalog());
        let cmd = WalkCommand::new(&rules, &registry, &catalog, seeded());
        let options = WalkOptions {
            answers: vec![true, true, true],
            ..WalkOptions::new(position("A.1", "A1"))
        };

        let output = cmd.run(&options);
        assert!(output.success);
        assert!(output.steps[1].snapshot.in_subgroup());
        assert_eq!(output.diagnosis.as_deref(), Some("depression2"));
    }

    #[test]
    fn test_unknown_topic() {
        let (rules, registry, catalog) = (rules(), registry(), catalog());
        let cmd = WalkCommand::new(&rules, &registry, &catalog, seeded());
        let options = WalkOptions::new(WalkStart::Topic("sleep".to_string()));

        let output = cmd.run(&options);
        assert!(!output.success);
        assert!(!output.rule_error);
        assert!(output.error.unwrap().contains("sleep"));
    }

    #[test]
    fn test_unknown_start_is_rule_error() {
        let (rules, registry, catalog) = (rules(), registry(), catalog());
        let cmd = WalkCommand::new(&rules, &registry, &catalog, seeded());
        let options = WalkOptions::new(position("A.1", "A77"));

        let output = cmd.run(&options);
        assert!(!output.success);
        assert!(output.rule_error);
        assert!(output.steps.is_empty());
    }

    #[test]
    fn test_rejected_transition_stops_walk() {
        let (rules, registry, catalog) = (rules(), registry(), catalog());
        let cmd = WalkCommand::new(&rules, &registry, &catalog, seeded());
        let options = WalkOptions {
            answers: vec![false, true],
            ..WalkOptions::new(position("B.1", "B1"))
        };

        let output = cmd.run(&options);
        assert!(!output.success);
        assert!(output.rule_error);
        assert_eq!(output.answers_used, 0);
        assert_eq!(output.steps.len(), 1);
        assert!(output.error.as_deref().unwrap().contains("B.1.B1 -> N"));
    }

    #[test]
    fn test_export_written() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("walk.json");
        let (rules, registry, catalog) = (rules(), registry(), catalog());
        let cmd = WalkCommand::new(&rules, &registry, &catalog, seeded());
        let options = WalkOptions {
            answers: vec![false, true],
            export: Some(path.clone()),
            ..WalkOptions::new(position("A.1", "A1"))
        };

        let output = cmd.run(&options);
        assert!(output.success);
        assert!(output.exported_to.is_some());

        let export = HistoryExport::load(&path).unwrap();
        let record = &export.interviews[0];
        assert_eq!(record.answers, vec![false, true]);
        assert_eq!(record.diagnosis.as_deref(), Some("depression1"));
        assert_eq!(record.history.len(), 3);
    }

    #[test]
    fn test_format_output() {
        let (rules, registry, catalog) = (rules(), registry(), catalog());
        let cmd = WalkCommand::new(&rules, &registry, &catalog, seeded());
        let options = WalkOptions {
            answers: vec![false],
            ..WalkOptions::new(position("A.1", "A1"))
        };
        let output = cmd.run(&options);

        let text = cmd.format_output(&output, &options);
        assert!(text.contains("A.1/A1"));
        assert!(text.contains("A.1/A2"));

        let json_options = WalkOptions {
            json: true,
            ..options.clone()
        };
        let json: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&output, &json_options)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["steps"][1]["snapshot"]["current_state"], "A2");

        let quiet_options = WalkOptions {
            quiet: true,
            ..options
        };
        assert!(cmd.format_output(&output, &quiet_options).is_empty());
    }
}
