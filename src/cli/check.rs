//! Check command for diagtree.
//!
//! Loads the configured rule tables and runs the rule audit. A clean audit
//! means every branch and cross rule leads somewhere the engine can go.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{DiagError, Result};
use crate::rules::{AuditFinding, Catalog, RuleStore, SubgroupRegistry};

/// Options for the check command.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Counts of what was loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCounts {
    pub groups: usize,
    pub states: usize,
    pub cross_rules: usize,
    pub subgroups: usize,
    pub terminals: usize,
    pub topics: usize,
}

/// Output format for the check command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckOutput {
    /// Whether the tables loaded and the audit found nothing.
    pub success: bool,
    /// What was loaded.
    pub counts: RuleCounts,
    /// Audit findings.
    pub findings: Vec<AuditFinding>,
    /// Whether the failure came from the rule tables.
    #[serde(default)]
    pub rule_error: bool,
    /// Error message if the tables could not be loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckOutput {
    /// Create an output from a finished audit.
    pub fn audited(counts: RuleCounts, findings: Vec<AuditFinding>) -> Self {
        Self {
            success: findings.is_empty(),
            rule_error: !findings.is_empty(),
            counts,
            findings,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: &DiagError) -> Self {
        Self {
            success: false,
            rule_error: error.is_rule_error(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Check failed: {}", error);
        }

        let c = &self.counts;
        let mut lines = vec![format!(
            "Loaded {} groups, {} states, {} cross rules, {} subgroups, {} terminals, {} topics",
            c.groups, c.states, c.cross_rules, c.subgroups, c.terminals, c.topics
        )];

        if self.findings.is_empty() {
            lines.push("No problems found.".to_string());
            return lines.join("\n");
        }

        lines.push(format!("{} problem(s):", self.findings.len()));
        for finding in &self.findings {
            lines.push(format!("  {:<24} {}", finding.location, finding.message));
        }
        lines.join("\n")
    }
}

/// The check command implementation.
pub struct CheckCommand<'a> {
    config: &'a Config,
}

impl<'a> CheckCommand<'a> {
    /// Create a new check command.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run the check command.
    pub fn run(&self, _options: &CheckOptions) -> CheckOutput {
        match self.load() {
            Ok((rules, registry, catalog)) => {
                let counts = RuleCounts {
                    groups: rules.group_count(),
                    states: rules.state_count(),
                    cross_rules: rules.cross_rule_count(),
                    subgroups: registry.len(),
                    terminals: catalog.terminal_count(),
                    topics: catalog.topics().count(),
                };
                let findings = rules.audit(&registry, &catalog);
                CheckOutput::audited(counts, findings)
            }
            Err(e) => CheckOutput::failure(&e),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CheckOutput, options: &CheckOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            output.format_text()
        }
    }

    fn load(&self) -> Result<(RuleStore, SubgroupRegistry, Catalog)> {
        let rules = self.config.rules.load_store()?;
        let registry = self.config.registry()?;
        let catalog = self.config.rules.load_catalog()?;
        Ok((rules, registry, catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FindingKind;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.rules.dir = dir.path().to_path_buf();
        config
    }

    fn write_rules(dir: &TempDir, groups: &str, cross: &str) {
        fs::write(dir.path().join("ingroup_rules.json"), groups).unwrap();
        fs::write(dir.path().join("crossgroup_rules.json"), cross).unwrap();
    }

    #[test]
    fn test_check_clean_tables() {
        let dir = TempDir::new().unwrap();
        write_rules(
            &dir,
            r#"{"A.1": {"A1": {"N": ["A2", "time0"]}, "A2": {"Y": ["done", "time0"]}}}"#,
            "{}",
        );
        fs::write(dir.path().join("diagnosis_list.json"), r#"["done"]"#).unwrap();

        let config = config_for(&dir);
        let output = CheckCommand::new(&config).run(&CheckOptions::default());

        assert!(output.success, "{:?}", output.findings);
        assert_eq!(output.counts.groups, 1);
        assert_eq!(output.counts.states, 2);
        assert_eq!(output.counts.terminals, 1);
        assert_eq!(output.counts.subgroups, 9);
        assert!(output.format_text().contains("No problems found"));
    }

    #[test]
    fn test_check_reports_dangling_cross_rule() {
        let dir = TempDir::new().unwrap();
        write_rules(
            &dir,
            r#"{"A.1": {"A1": {"N": ["A4", "time0"]}}}"#,
            r#"{"A.1:A4": ["Z.9", "Z1", "time0"]}"#,
        );

        let config = config_for(&dir);
        let output = CheckCommand::new(&config).run(&CheckOptions::default());

        assert!(!output.success);
        assert!(output.rule_error);
        assert!(output
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::DanglingCrossRule));
        assert!(output.format_text().contains("problem(s)"));
    }

    #[test]
    fn test_check_missing_tables() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        let output = CheckCommand::new(&config).run(&CheckOptions::default());

        assert!(!output.success);
        assert!(output.rule_error);
        assert!(output.format_text().starts_with("Check failed"));
    }

    #[test]
    fn test_check_malformed_table() {
        let dir = TempDir::new().unwrap();
        write_rules(&dir, "{not json", "{}");
        let config = config_for(&dir);
        let output = CheckCommand::new(&config).run(&CheckOptions::default());

        assert!(!output.success);
        assert!(output.error.unwrap().contains("ingroup_rules.json"));
    }

    #[test]
    fn test_check_json_output() {
        let dir = TempDir::new().unwrap();
        write_rules(&dir, r#"{"A.1": {"A1": {}}}"#, "{}");
        let config = config_for(&dir);
        let cmd = CheckCommand::new(&config);
        let options = CheckOptions {
            json: true,
            ..Default::default()
        };

        let output = cmd.run(&options);
        let json: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&output, &options)).unwrap();
        assert_eq!(json["counts"]["states"], 1);
        assert_eq!(json["findings"][0]["kind"], "empty_rule");
    }
}
