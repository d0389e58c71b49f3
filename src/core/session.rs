//! Per-interview session state.
//!
//! A session is owned by exactly one engine and never shared. It tracks the
//! current position, the active subgroup with its pending queue, the
//! responses recorded inside each subgroup, and the append-only history.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

/// One visited position in the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Group id.
    pub group: String,
    /// Active subgroup, when the position is a sub-state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<String>,
    /// State id.
    pub state: String,
    /// Zero-based, strictly increasing position in the log.
    pub sequence_number: u64,
}

/// A scheduled sub-state and the time tag it is asked with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingItem {
    /// Sub-state id.
    pub state: String,
    /// Time tag.
    pub time: String,
}

impl PendingItem {
    /// Create a pending item.
    pub fn new(state: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            time: time.into(),
        }
    }
}

/// A subgroup being worked through.
///
/// The head of `pending` is always the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveSubgroup {
    id: String,
    pending: VecDeque<PendingItem>,
}

/// Mutable state of one interview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    group: String,
    state: String,
    time: String,
    active: Option<ActiveSubgroup>,
    responses: HashMap<String, BTreeMap<String, bool>>,
    history: Vec<HistoryEntry>,
}

impl Session {
    /// Start a session at a position. The start is history entry 0.
    pub fn new(group: impl Into<String>, state: impl Into<String>, time: impl Into<String>) -> Self {
        let mut session = Self {
            group: group.into(),
            state: state.into(),
            time: time.into(),
            active: None,
            responses: HashMap::new(),
            history: Vec::new(),
        };
        session.record_history();
        session
    }

    /// Current group id.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Current state id.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Current time tag.
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Active subgroup id, if any.
    pub fn subgroup(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    /// Pending sub-states, head first. Empty outside a subgroup.
    pub fn pending(&self) -> impl Iterator<Item = &PendingItem> {
        self.active.iter().flat_map(|a| a.pending.iter())
    }

    /// Number of pending sub-states, including the current one.
    pub fn pending_len(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.pending.len())
    }

    /// Full history log.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Responses recorded for a subgroup since it was last entered.
    pub fn responses(&self, subgroup: &str) -> Option<&BTreeMap<String, bool>> {
        self.responses.get(subgroup)
    }

    /// Number of yes responses for `subgroup` if `state` were answered with
    /// `response`, replacing any earlier answer to the same sub-state.
    pub(crate) fn yes_count_with(&self, subgroup: &str, state: &str, response: bool) -> usize {
        let earlier = self.responses.get(subgroup).map_or(0, |recorded| {
            recorded
                .iter()
                .filter(|(answered, yes)| answered.as_str() != state && **yes)
                .count()
        });
        earlier + usize::from(response)
    }

    pub(crate) fn record_response(&mut self, subgroup: &str, state: &str, response: bool) {
        self.responses
            .entry(subgroup.to_string())
            .or_default()
            .insert(state.to_string(), response);
    }

    /// Append the current position to the history log.
    pub(crate) fn record_history(&mut self) {
        let entry = HistoryEntry {
            group: self.group.clone(),
            subgroup: self.subgroup().map(str::to_string),
            state: self.state.clone(),
            sequence_number: self.history.len() as u64,
        };
        self.history.push(entry);
    }

    /// Move within the current group.
    pub(crate) fn move_to(&mut self, state: String, time: String) {
        self.state = state;
        self.time = time;
    }

    /// Move to a position in another group.
    pub(crate) fn jump_to(&mut self, group: String, state: String, time: String) {
        self.group = group;
        self.move_to(state, time);
    }

    /// Enter a subgroup with a freshly scheduled queue.
    ///
    /// Responses recorded during an earlier visit are discarded.
    pub(crate) fn enter_subgroup(&mut self, id: String, pending: VecDeque<PendingItem>) {
        if let Some(head) = pending.front() {
            self.state = head.state.clone();
            self.time = head.time.clone();
        }
        self.responses.entry(id.clone()).or_default().clear();
        self.active = Some(ActiveSubgroup { id, pending });
    }

    /// Drop the answered head, queueing `follow_up` right behind it.
    ///
    /// Returns `false` when the queue is exhausted; the position is then left
    /// unchanged for the caller to finalize.
    pub(crate) fn advance_queue(&mut self, follow_up: Option<PendingItem>) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if let Some(item) = follow_up {
            let at = active.pending.len().min(1);
            active.pending.insert(at, item);
        }
        active.pending.pop_front();

        match active.pending.front() {
            Some(head) => {
                self.state = head.state.clone();
                self.time = head.time.clone();
                true
            }
            None => false,
        }
    }

    /// Leave the active subgroup, standing on the subgroup's own entry.
    pub(crate) fn exit_subgroup(&mut self) {
        if let Some(active) = self.active.take() {
            self.state = active.id;
        }
    }
}
