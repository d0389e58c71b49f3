//! Diagnostic interview state machine.
//!
//! The engine walks one interview through the rule tables. Each call to
//! [`Engine::advance`] applies exactly one of three transition modes, in
//! this order of precedence:
//!
//! 1. **Sub-state** (a subgroup queue is pending): record the answer, queue
//!    a follow-up if the sub-state's rule names one, and move to the next
//!    queued sub-state. When the queue runs out the subgroup is scored and
//!    its own Y/N branch is taken with the verdict.
//! 2. **Cross-group jump** (the position has a cross rule): jump to its
//!    target regardless of the answer.
//! 3. **Normal**: take the Y/N branch of the current state, entering a
//!    subgroup when the branch names one.
//!
//! Every transition is resolved before anything is mutated, so a failed
//! `advance` leaves the session exactly where it was.

use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::EngineConfig;
use crate::core::response::Truthy;
use crate::core::session::{HistoryEntry, PendingItem, Session};
use crate::core::snapshot::{SessionReporter, StateSnapshot};
use crate::error::{DiagError, Result};
use crate::rules::{Branch, RuleStore, SubgroupRegistry, Target};

/// A resolved, not yet applied, transition.
#[derive(Debug)]
enum Move {
    Step { state: String, time: String },
    Enter { subgroup: String, queue: VecDeque<PendingItem> },
}

/// Diagnostic interview state machine.
///
/// Borrows the shared rule tables and owns the session of one interview.
#[derive(Debug)]
pub struct Engine<'a, R: Rng = StdRng> {
    /// Group and cross rules.
    rules: &'a RuleStore,
    /// Subgroup catalog.
    registry: &'a SubgroupRegistry,
    /// Snapshot builder.
    reporter: SessionReporter,
    /// Time tag for follow-ups that carry none.
    followup_time: String,
    /// The interview being driven.
    session: Session,
    /// Source for shuffling and time-tag sampling.
    rng: R,
}

impl<'a> Engine<'a, StdRng> {
    /// Create an engine with default settings and an unseeded generator.
    pub fn new(
        rules: &'a RuleStore,
        registry: &'a SubgroupRegistry,
        group: impl Into<String>,
        state: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(rules, registry, &EngineConfig::default(), group, state)
    }

    /// Create an engine from configuration.
    ///
    /// A configured seed makes subgroup scheduling reproducible.
    pub fn with_config(
        rules: &'a RuleStore,
        registry: &'a SubgroupRegistry,
        config: &EngineConfig,
        group: impl Into<String>,
        state: impl Into<String>,
    ) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Engine::with_rng(rules, registry, config, group, state, rng)
    }
}

impl<'a, R: Rng> Engine<'a, R> {
    /// Create an engine with an explicit random source.
    ///
    /// Fails with `UnknownState` when the start position is neither defined
    /// in the group rules nor the origin of a cross rule.
    pub fn with_rng(
        rules: &'a RuleStore,
        registry: &'a SubgroupRegistry,
        config: &EngineConfig,
        group: impl Into<String>,
        state: impl Into<String>,
        rng: R,
    ) -> Result<Self> {
        let group = group.into();
        let state = state.into();

        if !rules.has_state(&group, &state) && rules.cross_rule(&group, &state).is_none() {
            return Err(DiagError::unknown_state(group, state));
        }

        tracing::debug!(group = %group, state = %state, "starting interview");

        Ok(Self {
            rules,
            registry,
            reporter: SessionReporter::new(config.history_tail),
            followup_time: config.followup_time.clone(),
            session: Session::new(group, state, config.initial_time.clone()),
            rng,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current group id.
    pub fn current_group(&self) -> &str {
        self.session.group()
    }

    /// Current state id.
    pub fn current_state(&self) -> &str {
        self.session.state()
    }

    /// Active subgroup id, if any.
    pub fn current_subgroup(&self) -> Option<&str> {
        self.session.subgroup()
    }

    /// Current time tag.
    pub fn current_time(&self) -> &str {
        self.session.time()
    }

    /// Check whether a subgroup is being worked through.
    pub fn is_in_subgroup(&self) -> bool {
        self.session.subgroup().is_some()
    }

    /// Full history log.
    pub fn history(&self) -> &[HistoryEntry] {
        self.session.history()
    }

    /// Pending sub-states, head first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingItem> {
        self.session.pending()
    }

    /// Responses recorded for a subgroup since it was last entered.
    pub fn recorded_responses(&self, subgroup: &str) -> Option<&BTreeMap<String, bool>> {
        self.session.responses(subgroup)
    }

    /// The session being driven.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Consume the engine, keeping the history log.
    pub fn into_history(self) -> Vec<HistoryEntry> {
        self.session.history().to_vec()
    }

    /// Snapshot of the current position without transitioning.
    pub fn snapshot(&self) -> StateSnapshot {
        self.reporter.snapshot(&self.session)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Advance the interview with a yes/no response.
    pub fn advance(&mut self, response: bool) -> Result<StateSnapshot> {
        let has_cross = self
            .rules
            .cross_rule(self.session.group(), self.session.state())
            .is_some();

        let outcome = match self.session.subgroup().map(str::to_string) {
            Some(subgroup) => self.advance_substate(&subgroup, response),
            None if has_cross => self.jump(),
            None => self.advance_normal(response),
        };

        if let Err(ref e) = outcome {
            tracing::warn!(
                group = %self.session.group(),
                state = %self.session.state(),
                response,
                error = %e,
                "transition rejected"
            );
        }

        outcome.map(|()| self.snapshot())
    }

    /// Advance with any value that reads as yes/no.
    pub fn advance_with<T: Truthy + ?Sized>(&mut self, response: &T) -> Result<StateSnapshot> {
        self.advance(response.truthy())
    }

    /// Sub-state mode: record, queue any follow-up, move on or finalize.
    fn advance_substate(&mut self, subgroup: &str, response: bool) -> Result<()> {
        let rules = self.rules;
        let group = self.session.group().to_string();
        let current = self.session.state().to_string();
        let branch = Branch::from_response(response);

        let follow_up = rules
            .substate_rule(&group, subgroup, &current)
            .and_then(|rule| rule.branch(branch))
            .map(|target| {
                PendingItem::new(
                    target.state_id(),
                    target.time().unwrap_or(self.followup_time.as_str()),
                )
            });

        if self.session.pending_len() <= 1 && follow_up.is_none() {
            return self.finalize_subgroup(&group, subgroup, &current, response);
        }

        if let Some(item) = &follow_up {
            tracing::debug!(subgroup, after = %current, follow_up = %item.state, "queued follow-up");
        }

        self.session.record_response(subgroup, &current, response);
        self.session.advance_queue(follow_up);
        self.session.record_history();

        tracing::debug!(
            subgroup,
            from = %current,
            to = %self.session.state(),
            remaining = self.session.pending_len().saturating_sub(1),
            "sub-state transition"
        );
        Ok(())
    }

    /// Score the subgroup and take its own branch with the verdict.
    fn finalize_subgroup(
        &mut self,
        group: &str,
        subgroup: &str,
        last: &str,
        response: bool,
    ) -> Result<()> {
        let (_, threshold) = self.registry.required_states(subgroup)?;
        let yes_count = self.session.yes_count_with(subgroup, last, response);
        let verdict = yes_count >= threshold as usize;

        let next = self.resolve(group, subgroup, verdict)?;

        tracing::info!(subgroup, yes_count, threshold, verdict, "subgroup finalized");

        self.session.record_response(subgroup, last, response);
        self.session.advance_queue(None);
        self.session.exit_subgroup();
        self.apply(next);
        Ok(())
    }

    /// Cross-group mode: jump unconditionally to the rule's target.
    fn jump(&mut self) -> Result<()> {
        let group = self.session.group().to_string();
        let state = self.session.state().to_string();
        let rule = self
            .rules
            .cross_rule(&group, &state)
            .cloned()
            .ok_or_else(|| DiagError::unknown_state(&group, &state))?;

        self.rules.check_cross_target(&group, &state, &rule)?;

        tracing::debug!(
            from_group = %group,
            from_state = %state,
            to_group = %rule.group,
            to_state = %rule.state,
            "cross-group jump"
        );

        self.session.jump_to(rule.group, rule.state, rule.time);
        self.session.record_history();
        Ok(())
    }

    /// Normal mode: take the Y/N branch of the current state.
    fn advance_normal(&mut self, response: bool) -> Result<()> {
        let group = self.session.group().to_string();
        let state = self.session.state().to_string();
        let next = self.resolve(&group, &state, response)?;
        self.apply(next);
        Ok(())
    }

    /// Work out where the branch of `(group, state)` for `response` leads.
    ///
    /// Consumes randomness when the branch enters a subgroup but never
    /// touches the session.
    fn resolve(&mut self, group: &str, state: &str, response: bool) -> Result<Move> {
        let rules = self.rules;
        let branch = Branch::from_response(response);
        let target = rules
            .state_rule(group, state)?
            .branch(branch)
            .ok_or_else(|| DiagError::invalid_transition(group, state, branch.key()))?;

        let id = target.state_id();
        if self.registry.contains(id) {
            let queue = schedule(self.registry, &mut self.rng, id)?;
            return Ok(Move::Enter {
                subgroup: id.to_string(),
                queue,
            });
        }

        match target {
            Target::Step { state: next, time } => Ok(Move::Step {
                state: next.clone(),
                time: time.clone(),
            }),
            Target::Bare(id) => Err(DiagError::invalid_transition(
                group,
                state,
                format!("{} (bare target {} is not a subgroup)", branch.key(), id),
            )),
        }
    }

    /// Commit a resolved transition and log it.
    fn apply(&mut self, next: Move) {
        let from = self.session.state().to_string();
        match next {
            Move::Step { state, time } => {
                self.session.move_to(state, time);
                tracing::debug!(
                    group = %self.session.group(),
                    from = %from,
                    to = %self.session.state(),
                    "transition"
                );
            }
            Move::Enter { subgroup, queue } => {
                tracing::info!(
                    group = %self.session.group(),
                    from = %from,
                    subgroup = %subgroup,
                    size = queue.len(),
                    "entering subgroup"
                );
                self.session.enter_subgroup(subgroup, queue);
            }
        }
        self.session.record_history();
    }
}

/// Build the shuffled queue for a subgroup.
///
/// The first sub-state gets the anchor tag; each later one draws a tag from
/// the pool independently, with replacement.
fn schedule<R: Rng>(
    registry: &SubgroupRegistry,
    rng: &mut R,
    subgroup: &str,
) -> Result<VecDeque<PendingItem>> {
    let (required, _) = registry.required_states(subgroup)?;
    let (anchor, pool) = registry.time_policy(subgroup)?;

    let mut order: Vec<&String> = required.iter().collect();
    order.shuffle(rng);

    let mut queue = VecDeque::with_capacity(order.len());
    for (i, state) in order.into_iter().enumerate() {
        let time = if i == 0 {
            anchor.to_string()
        } else {
            pool.choose(rng).cloned().ok_or_else(|| {
                DiagError::config_malformed(
                    format!("subgroup {}", subgroup),
                    "time tag pool is empty",
                )
            })?
        };
        queue.push_back(PendingItem::new(state.clone(), time));
    }

    Ok(queue)
}
