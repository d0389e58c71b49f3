//! Subgroups command for diagtree.
//!
//! Lists the subgroup registry after configuration overrides.

use serde::{Deserialize, Serialize};

use crate::rules::{Subgroup, SubgroupRegistry};

/// Options for the subgroups command.
#[derive(Debug, Clone, Default)]
pub struct SubgroupsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Summary of a single subgroup for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgroupSummary {
    /// Subgroup id.
    pub id: String,
    /// Required sub-states in catalog order.
    pub required: Vec<String>,
    /// Yes answers needed for a positive verdict.
    pub threshold: u32,
    /// Time tag of the first sub-state asked.
    pub anchor: String,
    /// Time tags sampled for later sub-states.
    pub pool: Vec<String>,
}

impl SubgroupSummary {
    fn new(id: &str, subgroup: &Subgroup) -> Self {
        Self {
            id: id.to_string(),
            required: subgroup.required.clone(),
            threshold: subgroup.threshold,
            anchor: subgroup.anchor.clone(),
            pool: subgroup.pool.clone(),
        }
    }
}

/// Output format for the subgroups command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgroupsOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Registry entries in id order.
    pub subgroups: Vec<SubgroupSummary>,
    /// Number of entries.
    pub count: usize,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubgroupsOutput {
    /// Create a successful output.
    pub fn success(subgroups: Vec<SubgroupSummary>) -> Self {
        let count = subgroups.len();
        Self {
            success: true,
            subgroups,
            count,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            subgroups: vec![],
            count: 0,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Subgroups failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        if self.subgroups.is_empty() {
            return "No subgroups registered.".to_string();
        }

        let mut lines = vec![format!("Subgroups ({}):", self.count)];
        lines.push(String::new());
        lines.push(format!(
            "{:<6}  {:>5}  {:>9}  {:<7}  {}",
            "ID", "SIZE", "THRESHOLD", "ANCHOR", "SUB-STATES"
        ));
        lines.push("-".repeat(72));

        for sg in &self.subgroups {
            lines.push(format!(
                "{:<6}  {:>5}  {:>9}  {:<7}  {}",
                sg.id,
                sg.required.len(),
                sg.threshold,
                sg.anchor,
                sg.required.join(",")
            ));
        }

        lines.join("\n")
    }
}

/// The subgroups command implementation.
pub struct SubgroupsCommand<'a> {
    registry: &'a SubgroupRegistry,
}

impl<'a> SubgroupsCommand<'a> {
    /// Create a new subgroups command.
    pub fn new(registry: &'a SubgroupRegistry) -> Self {
        Self { registry }
    }

    /// Run the subgroups command.
    pub fn run(&self, _options: &SubgroupsOptions) -> SubgroupsOutput {
        let summaries = self
            .registry
            .iter()
            .map(|(id, sg)| SubgroupSummary::new(id, sg))
            .collect();
        SubgroupsOutput::success(summaries)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SubgroupsOutput, options: &SubgroupsOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            output.format_text()
        }
    }
}
