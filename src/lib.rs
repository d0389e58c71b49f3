//! diagtree - hierarchical diagnostic interview state machine
//!
//! Walks a respondent through grouped yes/no questions loaded from JSON rule
//! tables. Groups link to each other through cross rules, and batches of
//! sub-questions (subgroups) are shuffled and scored against a threshold.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod logging;
pub mod rules;
pub mod util;

pub use config::Config;
pub use core::{Engine, HistoryEntry, SessionReporter, StateSnapshot, Truthy};
pub use error::{DiagError, Result};
pub use export::{HistoryExport, InterviewRecord};
pub use rules::{Catalog, RuleStore, Subgroup, SubgroupId, SubgroupRegistry};

// CLI commands
pub use cli::{CheckCommand, SubgroupsCommand, WalkCommand};
