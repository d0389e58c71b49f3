//! Core interview logic.
//!
//! This module contains the diagnostic state machine, the per-interview
//! session it drives, and the snapshots it reports after each transition.

pub mod engine;
pub mod response;
pub mod session;
pub mod snapshot;

pub use engine::Engine;
pub use response::Truthy;
pub use session::{HistoryEntry, PendingItem, Session};
pub use snapshot::{SessionReporter, StateSnapshot, DEFAULT_HISTORY_TAIL, MAX_HISTORY_TAIL};
