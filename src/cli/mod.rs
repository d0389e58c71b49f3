//! CLI commands for diagtree.
//!
//! - **walk**: drive one interview with scripted answers
//! - **check**: load the rule tables and audit them
//! - **subgroups**: list the subgroup registry

pub mod check;
pub mod subgroups;
pub mod walk;

pub use check::CheckCommand;
pub use subgroups::SubgroupsCommand;
pub use walk::{parse_answer, WalkCommand};
