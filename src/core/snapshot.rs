//! Read-only projection of a session after each transition.

use serde::{Deserialize, Serialize};

use crate::core::session::{HistoryEntry, Session};

/// Most history entries a snapshot ever carries.
pub const MAX_HISTORY_TAIL: usize = 8;

/// Number of history entries carried in a snapshot by default.
pub const DEFAULT_HISTORY_TAIL: usize = MAX_HISTORY_TAIL;

/// The externally visible position of an interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Current group id.
    pub current_group: String,
    /// Active subgroup id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_subgroup: Option<String>,
    /// Current state id.
    pub current_state: String,
    /// Current time tag.
    pub current_time: String,
    /// Sub-states still to be asked after the current one.
    pub remaining: usize,
    /// `"<remaining> remaining"`.
    pub substate_progress: String,
    /// Most recent history entries, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl StateSnapshot {
    /// Check whether a subgroup is active.
    pub fn in_subgroup(&self) -> bool {
        self.current_subgroup.is_some()
    }
}

/// Builds snapshots with a bounded history tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReporter {
    tail: usize,
}

impl Default for SessionReporter {
    fn default() -> Self {
        Self {
            tail: DEFAULT_HISTORY_TAIL,
        }
    }
}

impl SessionReporter {
    /// Create a reporter keeping the last `tail` history entries.
    ///
    /// `tail` is clamped to `1..=MAX_HISTORY_TAIL`.
    pub fn new(tail: usize) -> Self {
        Self {
            tail: tail.clamp(1, MAX_HISTORY_TAIL),
        }
    }

    /// History tail length.
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Project the session into a snapshot.
    pub fn snapshot(&self, session: &Session) -> StateSnapshot {
        let remaining = match session.subgroup() {
            Some(_) => session.pending_len().saturating_sub(1),
            None => session.pending_len(),
        };
        let history = session.history();
        let start = history.len().saturating_sub(self.tail);

        StateSnapshot {
            current_group: session.group().to_string(),
            current_subgroup: session.subgroup().map(str::to_string),
            current_state: session.state().to_string(),
            current_time: session.time().to_string(),
            remaining,
            substate_progress: format!("{} remaining", remaining),
            history: history[start..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::PendingItem;

    #[test]
    fn test_snapshot_outside_subgroup() {
        let session = Session::new("A.1", "A1", "time0");
        let snapshot = SessionReporter::default().snapshot(&session);

        assert_eq!(snapshot.current_group, "A.1");
        assert_eq!(snapshot.current_state, "A1");
        assert_eq!(snapshot.current_time, "time0");
        assert!(!snapshot.in_subgroup());
        assert_eq!(snapshot.remaining, 0);
        assert_eq!(snapshot.substate_progress, "0 remaining");
        assert_eq!(snapshot.history.len(), 1);
    }

    #[test]
    fn test_snapshot_inside_subgroup() {
        let mut session = Session::new("A.1", "A1", "time0");
        session.enter_subgroup(
            "A00".to_string(),
            [PendingItem::new("A3", "time1"), PendingItem::new("A6", "time0")]
                .into_iter()
                .collect(),
        );
        session.record_history();

        let snapshot = SessionReporter::default().snapshot(&session);
        assert_eq!(snapshot.current_subgroup.as_deref(), Some("A00"));
        assert_eq!(snapshot.remaining, 1);
        assert_eq!(snapshot.substate_progress, "1 remaining");
    }

    #[test]
    fn test_history_tail_is_bounded() {
        let mut session = Session::new("A.1", "A1", "time0");
        for _ in 0..20 {
            session.record_history();
        }

        let snapshot = SessionReporter::default().snapshot(&session);
        assert_eq!(snapshot.history.len(), DEFAULT_HISTORY_TAIL);
        assert_eq!(snapshot.history.last().unwrap().sequence_number, 20);
        assert_eq!(snapshot.history[0].sequence_number, 13);
        // The session keeps everything
        assert_eq!(session.history().len(), 21);
    }

    #[test]
    fn test_custom_tail() {
        let mut session = Session::new("A.1", "A1", "time0");
        for _ in 0..5 {
            session.record_history();
        }
        let snapshot = SessionReporter::new(3).snapshot(&session);
        assert_eq!(snapshot.history.len(), 3);
    }

    #[test]
    fn test_tail_clamped_to_bounds() {
        let mut session = Session::new("A.1", "A1", "time0");
        for _ in 0..20 {
            session.record_history();
        }

        let wide = SessionReporter::new(12);
        assert_eq!(wide.tail(), MAX_HISTORY_TAIL);
        assert_eq!(wide.snapshot(&session).history.len(), MAX_HISTORY_TAIL);

        let empty = SessionReporter::new(0);
        assert_eq!(empty.tail(), 1);
        let snapshot = empty.snapshot(&session);
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].sequence_number, 20);
    }

    #[test]
    fn test_snapshot_serialization_keys() {
        let session = Session::new("A.1", "A1", "time0");
        let json = serde_json::to_value(SessionReporter::default().snapshot(&session)).unwrap();
        assert!(json.get("current_subgroup").is_none());
        assert_eq!(json["substate_progress"], "0 remaining");
        assert_eq!(json["history"][0]["sequence_number"], 0);
    }
}
