//! Subgroup registry.
//!
//! A subgroup is a batch of required sub-questions that is shuffled on entry
//! and scored against a pass threshold. The nine subgroups of the reference
//! interview are fixed domain data and live in [`SubgroupId`]; the registry
//! copies them into owned entries so that configuration can replace or add
//! entries before the registry is frozen and shared.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};

/// The built-in subgroups of the reference interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubgroupId {
    A00,
    A01,
    A02,
    A03,
    A04,
    F00,
    F01,
    K00,
    K01,
}

// Secondary time-tag pools. Duplicates are intentional: sampling is uniform
// over the slots, so repeated tags are weighted.
const POOL_A0X: [&str; 7] = [
    "time3", "time0", "time0", "time0", "time3", "time0", "time2",
];
const POOL_A02_A03: [&str; 7] = [
    "time3", "time5", "time0", "time0", "time3", "time0", "time0",
];
const POOL_A04: [&str; 7] = [
    "time13", "time0", "time0", "time3", "time0", "time0", "time3",
];
const POOL_F00: [&str; 7] = [
    "time0", "time7", "time8", "time0", "time0", "time8", "time0",
];
const POOL_F01_K0X: [&str; 7] = [
    "time0", "time9", "time3", "time0", "time0", "time3", "time0",
];

impl SubgroupId {
    /// Every built-in subgroup, in catalog order.
    pub const ALL: [SubgroupId; 9] = [
        SubgroupId::A00,
        SubgroupId::A01,
        SubgroupId::A02,
        SubgroupId::A03,
        SubgroupId::A04,
        SubgroupId::F00,
        SubgroupId::F01,
        SubgroupId::K00,
        SubgroupId::K01,
    ];

    /// The identifier as it appears in rule tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubgroupId::A00 => "A00",
            SubgroupId::A01 => "A01",
            SubgroupId::A02 => "A02",
            SubgroupId::A03 => "A03",
            SubgroupId::A04 => "A04",
            SubgroupId::F00 => "F00",
            SubgroupId::F01 => "F01",
            SubgroupId::K00 => "K00",
            SubgroupId::K01 => "K01",
        }
    }

    /// Required sub-states in catalog order (shuffled on entry).
    pub fn required_states(&self) -> &'static [&'static str] {
        match self {
            SubgroupId::A00 => &["A3", "A6", "A9", "A12", "A13", "A16", "A17"],
            SubgroupId::A01 => &["A98", "A111", "A114", "A117", "A118", "A121", "A122"],
            SubgroupId::A02 => &[
                "A138", "A139", "A140", "A141", "A142", "A143", "A144", "A145", "A146", "A147",
            ],
            SubgroupId::A03 => &[
                "A255", "A256", "A257", "A258", "A259", "A260", "A261", "A262", "A263", "A264",
            ],
            SubgroupId::A04 => &[
                "A286", "A287", "A289", "A290", "A291", "A292", "A293", "A294", "A295", "A288",
            ],
            SubgroupId::F00 => &["F144", "F145", "F146", "F147", "F148", "F149"],
            SubgroupId::F01 => &["F169", "F170", "F171", "F172", "F173", "F174"],
            SubgroupId::K00 => &["K6", "K7", "K8", "K9", "K10", "K11", "K12", "K13", "K14"],
            SubgroupId::K01 => &["K16", "K17", "K18", "K19", "K20", "K21", "K22", "K23", "K24"],
        }
    }

    /// Minimum number of yes answers for a positive subgroup verdict.
    pub fn threshold(&self) -> u32 {
        match self {
            SubgroupId::A00 | SubgroupId::A01 | SubgroupId::K00 | SubgroupId::K01 => 5,
            SubgroupId::A02
            | SubgroupId::A03
            | SubgroupId::A04
            | SubgroupId::F00
            | SubgroupId::F01 => 3,
        }
    }

    /// Time tag given to the first sub-state visited.
    pub fn anchor_tag(&self) -> &'static str {
        match self {
            SubgroupId::A00 | SubgroupId::A01 => "time1",
            SubgroupId::A02 | SubgroupId::A03 => "time4",
            SubgroupId::A04 => "time12",
            SubgroupId::F00 => "time6",
            SubgroupId::F01 => "time10",
            SubgroupId::K00 | SubgroupId::K01 => "time11",
        }
    }

    /// Pool sampled (with replacement) for every sub-state after the first.
    pub fn tag_pool(&self) -> &'static [&'static str; 7] {
        match self {
            SubgroupId::A00 | SubgroupId::A01 => &POOL_A0X,
            SubgroupId::A02 | SubgroupId::A03 => &POOL_A02_A03,
            SubgroupId::A04 => &POOL_A04,
            SubgroupId::F00 => &POOL_F00,
            SubgroupId::F01 | SubgroupId::K00 | SubgroupId::K01 => &POOL_F01_K0X,
        }
    }

    /// Build the owned registry entry for this subgroup.
    pub fn to_subgroup(&self) -> Subgroup {
        Subgroup {
            required: self
                .required_states()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            threshold: self.threshold(),
            anchor: self.anchor_tag().to_string(),
            pool: self.tag_pool().iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl fmt::Display for SubgroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubgroupId {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self> {
        SubgroupId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| DiagError::unknown_subgroup(s))
    }
}

/// A registry entry: required sub-states, pass threshold, and time policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subgroup {
    /// Required sub-state ids.
    pub required: Vec<String>,
    /// Yes-count at or above which the subgroup verdict is positive.
    pub threshold: u32,
    /// Time tag for the first sub-state of the shuffled queue.
    pub anchor: String,
    /// Candidate time tags for the remaining sub-states.
    pub pool: Vec<String>,
}

impl Subgroup {
    /// Create a registry entry.
    pub fn new<S: Into<String>>(
        required: impl IntoIterator<Item = S>,
        threshold: u32,
        anchor: impl Into<String>,
        pool: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            threshold,
            anchor: anchor.into(),
            pool: pool.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the entry is usable by the engine.
    fn validate(&self, id: &str) -> Result<()> {
        let source = format!("subgroup {}", id);
        if self.required.is_empty() {
            return Err(DiagError::config_malformed(
                source,
                "required sub-state list is empty",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.required.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(DiagError::config_malformed(
                source,
                format!("sub-state {} is listed twice", dup),
            ));
        }
        if self.anchor.is_empty() {
            return Err(DiagError::config_malformed(source, "anchor time tag is empty"));
        }
        if self.required.len() > 1 && self.pool.is_empty() {
            return Err(DiagError::config_malformed(
                source,
                "time tag pool is empty but more than one sub-state is required",
            ));
        }
        Ok(())
    }
}

/// Read-only catalog of subgroups keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubgroupRegistry {
    entries: BTreeMap<String, Subgroup>,
}

impl SubgroupRegistry {
    /// Create an empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create the registry holding the nine built-in subgroups.
    pub fn builtin() -> Self {
        let entries = SubgroupId::ALL
            .iter()
            .map(|id| (id.as_str().to_string(), id.to_subgroup()))
            .collect();
        Self { entries }
    }

    /// Add or replace an entry.
    pub fn with_subgroup(mut self, id: impl Into<String>, subgroup: Subgroup) -> Result<Self> {
        let id = id.into();
        subgroup.validate(&id)?;
        self.entries.insert(id, subgroup);
        Ok(self)
    }

    /// Apply a set of configured entries on top of this registry.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Subgroup>) -> Result<Self> {
        for (id, subgroup) in overrides {
            tracing::debug!(subgroup = %id, "applying subgroup override");
            self = self.with_subgroup(id.clone(), subgroup.clone())?;
        }
        Ok(self)
    }

    /// Check whether `id` names a subgroup.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Look up an entry.
    pub fn get(&self, id: &str) -> Option<&Subgroup> {
        self.entries.get(id)
    }

    /// Required sub-states and pass threshold for a subgroup.
    pub fn required_states(&self, id: &str) -> Result<(&[String], u32)> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| DiagError::unknown_subgroup(id))?;
        Ok((&entry.required, entry.threshold))
    }

    /// Anchor tag and secondary tag pool for a subgroup.
    pub fn time_policy(&self, id: &str) -> Result<(&str, &[String])> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| DiagError::unknown_subgroup(id))?;
        Ok((&entry.anchor, &entry.pool))
    }

    /// Iterate entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Subgroup)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
