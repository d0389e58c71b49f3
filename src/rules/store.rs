//! Rule store: per-group branch rules and cross-group jump rules.
//!
//! Two JSON tables feed the store:
//!
//! - The group-rule table maps group id → state id → branch rule. A branch
//!   rule has `"Y"`/`"N"` keys whose values are `[next_state, time_tag]`, a
//!   bare id (a subgroup to enter, or a follow-up inside a subgroup), or
//!   `null`. An entry named after a subgroup carries the subgroup's own
//!   `"Y"`/`"N"` branches next to its sub-state rules.
//! - The cross-rule table maps `"<group>:<state>"` → `[group, state, time]`.
//!
//! Structure is validated at load time. Whether every referenced target
//! exists is checked lazily, when a transition actually reaches it, or
//! eagerly through [`RuleStore::audit`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DiagError, Result};
use crate::rules::catalog::Catalog;
use crate::rules::registry::SubgroupRegistry;
use crate::util::read_rule_source;

const GROUP_SOURCE: &str = "group rules";
const CROSS_SOURCE: &str = "cross rules";

/// Which branch of a rule a response selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    /// Affirmative response, key `"Y"`.
    Yes,
    /// Negative response, key `"N"`.
    No,
}

impl Branch {
    /// Select the branch for a response.
    pub fn from_response(response: bool) -> Self {
        if response {
            Branch::Yes
        } else {
            Branch::No
        }
    }

    /// The key used in rule tables.
    pub fn key(&self) -> &'static str {
        match self {
            Branch::Yes => "Y",
            Branch::No => "N",
        }
    }
}

/// The value of one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Move to `state`, asked with `time`.
    Step { state: String, time: String },
    /// A bare id: a subgroup to enter, or a follow-up sub-state.
    Bare(String),
}

impl Target {
    /// The state (or subgroup) id this target names.
    pub fn state_id(&self) -> &str {
        match self {
            Target::Step { state, .. } => state,
            Target::Bare(id) => id,
        }
    }

    /// The time tag, if the target carries one.
    pub fn time(&self) -> Option<&str> {
        match self {
            Target::Step { time, .. } => Some(time),
            Target::Bare(_) => None,
        }
    }
}

/// Yes/no branches of a state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchRule {
    yes: Option<Target>,
    no: Option<Target>,
}

impl BranchRule {
    /// Create a rule from its two branches.
    pub fn new(yes: Option<Target>, no: Option<Target>) -> Self {
        Self { yes, no }
    }

    /// The target for a branch, if defined.
    pub fn branch(&self, branch: Branch) -> Option<&Target> {
        match branch {
            Branch::Yes => self.yes.as_ref(),
            Branch::No => self.no.as_ref(),
        }
    }

    /// Iterate over the defined branches.
    pub fn targets(&self) -> impl Iterator<Item = (Branch, &Target)> {
        [(Branch::Yes, self.yes.as_ref()), (Branch::No, self.no.as_ref())]
            .into_iter()
            .filter_map(|(branch, target)| target.map(|t| (branch, t)))
    }

    fn is_empty(&self) -> bool {
        self.yes.is_none() && self.no.is_none()
    }
}

/// A state entry, with sub-state rules when the entry is a subgroup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StateEntry {
    rule: BranchRule,
    substates: HashMap<String, BranchRule>,
}

/// An unconditional redirect to another group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossRule {
    /// Target group id.
    pub group: String,
    /// Target state id.
    pub state: String,
    /// Target time tag.
    pub time: String,
}

/// Kind of problem reported by [`RuleStore::audit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A branch names a state that is neither defined nor a known exit.
    DanglingTarget,
    /// A cross rule targets an undefined group or state.
    DanglingCrossRule,
    /// A bare id outside a subgroup that is not a registered subgroup.
    BareTarget,
    /// A branch enters a subgroup whose own Y/N entry is missing.
    MissingSubgroupEntry,
    /// A state defines neither branch.
    EmptyRule,
}

/// One problem found by [`RuleStore::audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
    /// Problem category.
    pub kind: FindingKind,
    /// Where the problem sits (`group.state[.branch]`).
    pub location: String,
    /// Human-readable description.
    pub message: String,
}

impl AuditFinding {
    fn new(kind: FindingKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Immutable, validated rule tables.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    groups: HashMap<String, HashMap<String, StateEntry>>,
    cross: HashMap<(String, String), CrossRule>,
}

impl RuleStore {
    /// Load both tables from JSON text.
    ///
    /// Fails with `ConfigMissing` when either source is absent and with
    /// `ConfigMalformed` when either cannot be parsed.
    pub fn load(group_rules: Option<&str>, cross_rules: Option<&str>) -> Result<Self> {
        let group_text = group_rules.ok_or_else(|| DiagError::config_missing(GROUP_SOURCE))?;
        let cross_text = cross_rules.ok_or_else(|| DiagError::config_missing(CROSS_SOURCE))?;

        let group_value: Value = serde_json::from_str(group_text)
            .map_err(|e| DiagError::config_malformed(GROUP_SOURCE, e.to_string()))?;
        let cross_value: Value = serde_json::from_str(cross_text)
            .map_err(|e| DiagError::config_malformed(CROSS_SOURCE, e.to_string()))?;

        Self::from_values(&group_value, &cross_value)
    }

    /// Load both tables from files on disk.
    pub fn load_files(group_path: &Path, cross_path: &Path) -> Result<Self> {
        let group_text = read_rule_source(group_path)?;
        let cross_text = read_rule_source(cross_path)?;

        let group_value: Value = serde_json::from_str(&group_text).map_err(|e| {
            DiagError::config_malformed(group_path.display().to_string(), e.to_string())
        })?;
        let cross_value: Value = serde_json::from_str(&cross_text).map_err(|e| {
            DiagError::config_malformed(cross_path.display().to_string(), e.to_string())
        })?;

        Self::from_values(&group_value, &cross_value)
    }

    /// Build the store from already-parsed JSON values.
    pub fn from_values(group_rules: &Value, cross_rules: &Value) -> Result<Self> {
        let groups = parse_group_table(group_rules)?;
        let cross = parse_cross_table(cross_rules)?;

        tracing::debug!(
            groups = groups.len(),
            states = groups.values().map(HashMap::len).sum::<usize>(),
            cross_rules = cross.len(),
            "loaded rule tables"
        );

        Ok(Self { groups, cross })
    }

    /// Branch rule for a top-level state (or a subgroup's own entry).
    pub fn state_rule(&self, group: &str, state: &str) -> Result<&BranchRule> {
        self.groups
            .get(group)
            .and_then(|states| states.get(state))
            .map(|entry| &entry.rule)
            .ok_or_else(|| DiagError::unknown_state(group, state))
    }

    /// Branch rule for a sub-state, scoped to its subgroup.
    ///
    /// Sub-states without an entry simply have no follow-up, so absence is
    /// not an error.
    pub fn substate_rule(&self, group: &str, subgroup: &str, state: &str) -> Option<&BranchRule> {
        self.groups
            .get(group)
            .and_then(|states| states.get(subgroup))
            .and_then(|entry| entry.substates.get(state))
    }

    /// Cross rule for a position; `None` means "no jump here".
    pub fn cross_rule(&self, group: &str, state: &str) -> Option<&CrossRule> {
        self.cross.get(&(group.to_string(), state.to_string()))
    }

    /// Check whether a group is defined.
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Check whether a state is defined in a group.
    pub fn has_state(&self, group: &str, state: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|states| states.contains_key(state))
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of top-level state entries across all groups.
    pub fn state_count(&self) -> usize {
        self.groups.values().map(HashMap::len).sum()
    }

    /// Number of cross rules.
    pub fn cross_rule_count(&self) -> usize {
        self.cross.len()
    }

    /// Eagerly check every reference in the tables.
    ///
    /// Loading stays lazy; this is a lint pass for rule authors. Targets are
    /// accepted when they are defined in the group, name a registered
    /// subgroup, carry a cross rule of their own, or are terminal diagnosis
    /// codes in `catalog`.
    pub fn audit(&self, registry: &SubgroupRegistry, catalog: &Catalog) -> Vec<AuditFinding> {
        let mut findings = Vec::new();

        let mut group_ids: Vec<&String> = self.groups.keys().collect();
        group_ids.sort();

        for group in group_ids {
            let states = &self.groups[group];
            let mut state_ids: Vec<&String> = states.keys().collect();
            state_ids.sort();

            for state in state_ids {
                let entry = &states[state];
                let location = format!("{}.{}", group, state);

                if entry.rule.is_empty() {
                    // Unregistered sub-state containers are never entered as states
                    if entry.substates.is_empty() || registry.contains(state) {
                        findings.push(AuditFinding::new(
                            FindingKind::EmptyRule,
                            &location,
                            "state defines neither a Y nor an N branch",
                        ));
                    }
                }

                for (branch, target) in entry.rule.targets() {
                    let at = format!("{}.{}", location, branch.key());
                    let id = target.state_id();

                    if registry.contains(id) {
                        if !states.contains_key(id) {
                            findings.push(AuditFinding::new(
                                FindingKind::MissingSubgroupEntry,
                                at,
                                format!(
                                    "subgroup {} has no entry in group {} to decide its verdict",
                                    id, group
                                ),
                            ));
                        }
                        continue;
                    }

                    if let Target::Bare(id) = target {
                        findings.push(AuditFinding::new(
                            FindingKind::BareTarget,
                            at,
                            format!("bare target {} is not a registered subgroup", id),
                        ));
                        continue;
                    }

                    if !self.is_reachable_target(group, id, catalog) {
                        findings.push(AuditFinding::new(
                            FindingKind::DanglingTarget,
                            at,
                            format!("target {} is not defined in group {}", id, group),
                        ));
                    }
                }

                for (substate, rule) in &entry.substates {
                    for (branch, target) in rule.targets() {
                        let id = target.state_id();
                        if !entry.substates.contains_key(id)
                            && !registry
                                .get(state)
                                .is_some_and(|sg| sg.required.iter().any(|r| r == id))
                        {
                            findings.push(AuditFinding::new(
                                FindingKind::DanglingTarget,
                                format!("{}.{}.{}", location, substate, branch.key()),
                                format!("follow-up {} is not a sub-state of {}", id, state),
                            ));
                        }
                    }
                }
            }
        }

        let mut cross_keys: Vec<&(String, String)> = self.cross.keys().collect();
        cross_keys.sort();
        for key in cross_keys {
            if let Err(e) = self.check_cross_target(&key.0, &key.1, &self.cross[key]) {
                findings.push(AuditFinding::new(
                    FindingKind::DanglingCrossRule,
                    format!("{}:{}", key.0, key.1),
                    e.to_string(),
                ));
            }
        }

        findings
    }

    /// Validate that a cross rule's target group and state are defined.
    pub(crate) fn check_cross_target(&self, group: &str, state: &str, rule: &CrossRule) -> Result<()> {
        let from = format!("{}:{}", group, state);
        if !self.has_group(&rule.group) {
            return Err(DiagError::dangling_cross_rule(
                from,
                format!("group {}", rule.group),
            ));
        }
        if !self.has_state(&rule.group, &rule.state) {
            return Err(DiagError::dangling_cross_rule(
                from,
                format!("state {} in group {}", rule.state, rule.group),
            ));
        }
        Ok(())
    }

    fn is_reachable_target(&self, group: &str, state: &str, catalog: &Catalog) -> bool {
        self.has_state(group, state)
            || self.cross_rule(group, state).is_some()
            || catalog.is_terminal(state)
    }
}

fn parse_group_table(value: &Value) -> Result<HashMap<String, HashMap<String, StateEntry>>> {
    let table = as_object(value, GROUP_SOURCE, "top level")?;
    let mut groups = HashMap::with_capacity(table.len());

    for (group, states_value) in table {
        let states_obj = as_object(states_value, GROUP_SOURCE, &format!("group {}", group))?;
        let mut states = HashMap::with_capacity(states_obj.len());

        for (state, entry_value) in states_obj {
            let location = format!("{}.{}", group, state);
            let entry_obj = as_object(entry_value, GROUP_SOURCE, &location)?;
            states.insert(state.clone(), parse_state_entry(entry_obj, &location)?);
        }

        groups.insert(group.clone(), states);
    }

    Ok(groups)
}

fn parse_state_entry(obj: &Map<String, Value>, location: &str) -> Result<StateEntry> {
    let mut entry = StateEntry {
        rule: parse_branches(obj, location)?,
        substates: HashMap::new(),
    };

    for (key, value) in obj {
        if key == "Y" || key == "N" {
            continue;
        }
        let sub_location = format!("{}.{}", location, key);
        let sub_obj = as_object(value, GROUP_SOURCE, &sub_location)?;
        entry
            .substates
            .insert(key.clone(), parse_branches(sub_obj, &sub_location)?);
    }

    Ok(entry)
}

fn parse_branches(obj: &Map<String, Value>, location: &str) -> Result<BranchRule> {
    Ok(BranchRule {
        yes: parse_target(obj.get("Y"), location, "Y")?,
        no: parse_target(obj.get("N"), location, "N")?,
    })
}

fn parse_target(value: Option<&Value>, location: &str, key: &str) -> Result<Option<Target>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(Target::Bare(id.clone()))),
        Some(Value::Array(items)) => match items.as_slice() {
            [Value::String(state), Value::String(time)] => Ok(Some(Target::Step {
                state: state.clone(),
                time: time.clone(),
            })),
            _ => Err(DiagError::config_malformed(
                GROUP_SOURCE,
                format!(
                    "{}.{} must be [state, time] with two strings, got {}",
                    location,
                    key,
                    Value::Array(items.clone())
                ),
            )),
        },
        Some(other) => Err(DiagError::config_malformed(
            GROUP_SOURCE,
            format!("{}.{} has unsupported value {}", location, key, other),
        )),
    }
}

fn parse_cross_table(value: &Value) -> Result<HashMap<(String, String), CrossRule>> {
    let table = as_object(value, CROSS_SOURCE, "top level")?;
    let mut cross = HashMap::with_capacity(table.len());

    for (key, target) in table {
        let (group, state) = parse_cross_key(key)?;
        let rule = match target.as_array().map(Vec::as_slice) {
            Some([Value::String(to_group), Value::String(to_state), Value::String(time)]) => {
                CrossRule {
                    group: to_group.clone(),
                    state: to_state.clone(),
                    time: time.clone(),
                }
            }
            _ => {
                return Err(DiagError::config_malformed(
                    CROSS_SOURCE,
                    format!(
                        "value for '{}' must be [group, state, time], got {}",
                        key, target
                    ),
                ));
            }
        };
        cross.insert((group, state), rule);
    }

    Ok(cross)
}

fn parse_cross_key(key: &str) -> Result<(String, String)> {
    match key.split_once(':') {
        Some((group, state)) if !group.is_empty() && !state.is_empty() && !state.contains(':') => {
            Ok((group.to_string(), state.to_string()))
        }
        _ => Err(DiagError::config_malformed(
            CROSS_SOURCE,
            format!("key '{}' is not of the form <group>:<state>", key),
        )),
    }
}

fn as_object<'a>(value: &'a Value, source: &str, location: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        DiagError::config_malformed(source, format!("{} must be an object", location))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::registry::Subgroup;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn sample_store() -> RuleStore {
        let groups = json!({
            "A.1": {
                "A1": {"N": ["A2", "time0"], "Y": ["A00", "time1"]},
                "A2": {"N": ["A4", "time0"]},
                "A00": {
                    "Y": ["A7", "time0"],
                    "N": ["A8", "time0"],
                    "A3": {"Y": "A5", "N": null}
                }
            },
            "B.1": {
                "B1": {"Y": ["B2", "time0"], "N": ["B3", "time0"]}
            }
        });
        let cross = json!({"A.1:A4": ["B.1", "B1", "time2"]});
        RuleStore::from_values(&groups, &cross).unwrap()
    }

    fn small_registry() -> SubgroupRegistry {
        SubgroupRegistry::empty()
            .with_subgroup("A00", Subgroup::new(["A3", "A6"], 1, "time1", ["time0"]))
            .unwrap()
    }

    #[test]
    fn test_branch_from_response() {
        assert_eq!(Branch::from_response(true), Branch::Yes);
        assert_eq!(Branch::from_response(false).key(), "N");
    }

    #[test]
    fn test_state_rule_lookup() {
        let store = sample_store();
        let rule = store.state_rule("A.1", "A1").unwrap();
        assert_eq!(
            rule.branch(Branch::No),
            Some(&Target::Step {
                state: "A2".to_string(),
                time: "time0".to_string()
            })
        );
        assert_eq!(rule.branch(Branch::Yes).unwrap().state_id(), "A00");
    }

    #[test]
    fn test_missing_branch_is_none() {
        let store = sample_store();
        let rule = store.state_rule("A.1", "A2").unwrap();
        assert!(rule.branch(Branch::Yes).is_none());
    }

    #[test]
    fn test_unknown_state() {
        let store = sample_store();
        let err = store.state_rule("A.1", "A99").unwrap_err();
        assert!(matches!(err, DiagError::UnknownState { .. }));
        assert!(store.state_rule("Z.9", "A1").is_err());
    }

    #[test]
    fn test_substate_rule_scoped_to_subgroup() {
        let store = sample_store();
        let rule = store.substate_rule("A.1", "A00", "A3").unwrap();
        assert_eq!(rule.branch(Branch::Yes), Some(&Target::Bare("A5".to_string())));
        assert!(rule.branch(Branch::No).is_none());
        assert!(store.substate_rule("A.1", "A00", "A6").is_none());
        assert!(store.substate_rule("B.1", "A00", "A3").is_none());
    }

    #[test]
    fn test_subgroup_entry_is_also_a_state() {
        let store = sample_store();
        let rule = store.state_rule("A.1", "A00").unwrap();
        assert_eq!(rule.branch(Branch::Yes).unwrap().state_id(), "A7");
    }

    #[test]
    fn test_cross_rule_lookup() {
        let store = sample_store();
        let rule = store.cross_rule("A.1", "A4").unwrap();
        assert_eq!(rule.group, "B.1");
        assert_eq!(rule.state, "B1");
        assert_eq!(rule.time, "time2");
        assert!(store.cross_rule("A.1", "A1").is_none());
    }

    #[test]
    fn test_counts() {
        let store = sample_store();
        assert_eq!(store.group_count(), 2);
        assert_eq!(store.state_count(), 4);
        assert_eq!(store.cross_rule_count(), 1);
    }

    #[test]
    fn test_load_missing_sources() {
        let err = RuleStore::load(None, Some("{}")).unwrap_err();
        assert!(matches!(err, DiagError::ConfigMissing { .. }));
        assert!(err.to_string().contains("group rules"));

        let err = RuleStore::load(Some("{}"), None).unwrap_err();
        assert!(err.to_string().contains("cross rules"));
    }

    #[test]
    fn test_load_invalid_json() {
        let err = RuleStore::load(Some("{not json"), Some("{}")).unwrap_err();
        assert!(matches!(err, DiagError::ConfigMalformed { .. }));
    }

    #[test]
    fn test_load_text() {
        let store = RuleStore::load(
            Some(r#"{"A.1": {"A1": {"Y": ["A2", "time0"]}}}"#),
            Some(r#"{"A.1:A2": ["A.1", "A1", "time0"]}"#),
        )
        .unwrap();
        assert!(store.has_state("A.1", "A1"));
        assert!(store.cross_rule("A.1", "A2").is_some());
    }

    #[test]
    fn test_cross_key_without_colon_is_malformed() {
        let err = RuleStore::from_values(&json!({}), &json!({"A.1A4": ["B.1", "B1", "time2"]}))
            .unwrap_err();
        assert!(matches!(err, DiagError::ConfigMalformed { .. }));
        assert!(err.to_string().contains("A.1A4"));
    }

    #[test]
    fn test_cross_key_with_extra_colon_is_malformed() {
        let result =
            RuleStore::from_values(&json!({}), &json!({"A.1:A4:x": ["B.1", "B1", "time2"]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_cross_value_must_be_triple() {
        let result = RuleStore::from_values(&json!({}), &json!({"A.1:A4": ["B.1", "B1"]}));
        assert!(matches!(result, Err(DiagError::ConfigMalformed { .. })));

        let result = RuleStore::from_values(&json!({}), &json!({"A.1:A4": "B.1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_branch_value_shape_is_checked() {
        let result =
            RuleStore::from_values(&json!({"A.1": {"A1": {"Y": ["A2"]}}}), &json!({}));
        assert!(matches!(result, Err(DiagError::ConfigMalformed { .. })));

        let result = RuleStore::from_values(&json!({"A.1": {"A1": {"Y": 3}}}), &json!({}));
        assert!(result.is_err());

        let result = RuleStore::from_values(&json!({"A.1": ["A1"]}), &json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_does_not_check_targets() {
        // Dangling targets are only reported when reached
        let store = RuleStore::from_values(
            &json!({"A.1": {"A1": {"Y": ["NOWHERE", "time0"]}}}),
            &json!({"A.1:A1": ["Z.9", "Z1", "time0"]}),
        );
        assert!(store.is_ok());
    }

    #[test]
    fn test_load_files() {
        let dir = TempDir::new().unwrap();
        let group_path = dir.path().join("ingroup_rules.json");
        let cross_path = dir.path().join("crossgroup_rules.json");
        fs::write(&group_path, r#"{"A.1": {"A1": {"N": ["A2", "time0"]}}}"#).unwrap();
        fs::write(&cross_path, "{}").unwrap();

        let store = RuleStore::load_files(&group_path, &cross_path).unwrap();
        assert!(store.has_group("A.1"));
    }

    #[test]
    fn test_load_files_missing_cross_table() {
        let dir = TempDir::new().unwrap();
        let group_path = dir.path().join("ingroup_rules.json");
        fs::write(&group_path, "{}").unwrap();

        let err =
            RuleStore::load_files(&group_path, &dir.path().join("crossgroup_rules.json"))
                .unwrap_err();
        assert!(matches!(err, DiagError::ConfigMissing { .. }));
        assert!(err.to_string().contains("crossgroup_rules.json"));
    }

    #[test]
    fn test_check_cross_target() {
        let store = sample_store();
        let good = CrossRule {
            group: "B.1".to_string(),
            state: "B1".to_string(),
            time: "time2".to_string(),
        };
        assert!(store.check_cross_target("A.1", "A4", &good).is_ok());

        let bad_group = CrossRule {
            group: "Z.9".to_string(),
            ..good.clone()
        };
        let err = store.check_cross_target("A.1", "A4", &bad_group).unwrap_err();
        assert!(err.to_string().contains("group Z.9"));

        let bad_state = CrossRule {
            state: "B99".to_string(),
            ..good
        };
        let err = store.check_cross_target("A.1", "A4", &bad_state).unwrap_err();
        assert!(err.to_string().contains("state B99 in group B.1"));
    }

    #[test]
    fn test_audit_accepts_cross_and_terminal_targets() {
        let store = sample_store();
        let catalog = Catalog::new(["A7", "A8", "B2", "B3"], []);
        let findings = store.audit(&small_registry(), &catalog);

        // A5 is a follow-up outside the required list and without its own entry
        assert_eq!(findings.len(), 1, "{:?}", findings);
        assert_eq!(findings[0].kind, FindingKind::DanglingTarget);
        assert_eq!(findings[0].location, "A.1.A00.A3.Y");
    }

    #[test]
    fn test_audit_reports_dangling_targets() {
        let store = RuleStore::from_values(
            &json!({
                "A.1": {
                    "A1": {"Y": ["A9", "time0"], "N": "X00"},
                    "A2": {"Y": ["A00", "time1"]},
                    "A3": {}
                }
            }),
            &json!({"A.1:A1": ["Z.9", "Z1", "time0"]}),
        )
        .unwrap();
        let findings = store.audit(&small_registry(), &Catalog::default());
        let kinds: Vec<FindingKind> = findings.iter().map(|f| f.kind).collect();

        assert!(kinds.contains(&FindingKind::DanglingTarget));
        assert!(kinds.contains(&FindingKind::BareTarget));
        assert!(kinds.contains(&FindingKind::MissingSubgroupEntry));
        assert!(kinds.contains(&FindingKind::EmptyRule));
        assert!(kinds.contains(&FindingKind::DanglingCrossRule));
    }
}
