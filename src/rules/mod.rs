//! Rule tables consumed by the engine.
//!
//! Everything in this module is loaded once and shared read-only between
//! interview sessions.

pub mod catalog;
pub mod registry;
pub mod store;

pub use catalog::{Catalog, EntryPoint};
pub use registry::{Subgroup, SubgroupId, SubgroupRegistry};
pub use store::{AuditFinding, Branch, BranchRule, CrossRule, FindingKind, RuleStore, Target};
