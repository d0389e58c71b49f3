//! Configuration loading for diagtree.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.diagtree/config.toml`)
//! 3. User config (`~/.diagtree/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. With no config the engine reads the rule
//! tables from `./rules` and uses the built-in subgroup catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::snapshot::{DEFAULT_HISTORY_TAIL, MAX_HISTORY_TAIL};
use crate::error::{DiagError, Result};
use crate::rules::registry::{Subgroup, SubgroupRegistry};
use crate::rules::{Catalog, RuleStore};

/// Main configuration struct for diagtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Rule table locations.
    pub rules: RulesConfig,
    /// Engine behavior.
    pub engine: EngineConfig,
    /// Subgroup entries replacing or extending the built-in catalog.
    pub subgroups: BTreeMap<String, Subgroup>,
}

/// Rule table locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Directory holding the rule files.
    pub dir: PathBuf,
    /// Group-rule table file name.
    pub ingroup_file: String,
    /// Cross-rule table file name.
    pub crossgroup_file: String,
    /// Terminal diagnosis code list (optional file).
    pub diagnosis_file: String,
    /// Topic entry points (optional file).
    pub topic_file: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("rules"),
            ingroup_file: "ingroup_rules.json".to_string(),
            crossgroup_file: "crossgroup_rules.json".to_string(),
            diagnosis_file: "diagnosis_list.json".to_string(),
            topic_file: "topic_order_dict.json".to_string(),
        }
    }
}

impl RulesConfig {
    /// Path of the group-rule table.
    pub fn ingroup_path(&self) -> PathBuf {
        self.dir.join(&self.ingroup_file)
    }

    /// Path of the cross-rule table.
    pub fn crossgroup_path(&self) -> PathBuf {
        self.dir.join(&self.crossgroup_file)
    }

    /// Path of the terminal diagnosis list.
    pub fn diagnosis_path(&self) -> PathBuf {
        self.dir.join(&self.diagnosis_file)
    }

    /// Path of the topic entry point table.
    pub fn topic_path(&self) -> PathBuf {
        self.dir.join(&self.topic_file)
    }

    /// Load the rule store from the configured files.
    pub fn load_store(&self) -> Result<RuleStore> {
        RuleStore::load_files(&self.ingroup_path(), &self.crossgroup_path())
    }

    /// Load the interview catalog from the configured files.
    pub fn load_catalog(&self) -> Result<Catalog> {
        Catalog::load_files(&self.diagnosis_path(), &self.topic_path())
    }
}

/// Engine behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for subgroup shuffling and time-tag sampling. Unseeded when absent.
    pub seed: Option<u64>,
    /// History entries carried in each snapshot.
    pub history_tail: usize,
    /// Time tag of the starting position.
    pub initial_time: String,
    /// Time tag for follow-up sub-states injected without one.
    pub followup_time: String,
}

/// Minimum valid history_tail value.
pub const MIN_HISTORY_TAIL: usize = 1;

impl EngineConfig {
    /// Check if a history_tail value is valid (1 through 8).
    pub fn is_valid_history_tail(value: usize) -> bool {
        (MIN_HISTORY_TAIL..=MAX_HISTORY_TAIL).contains(&value)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            history_tail: DEFAULT_HISTORY_TAIL,
            initial_time: "time0".to_string(),
            followup_time: "time0".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    ///
    /// A relative rules directory from the project config is resolved
    /// against `cwd`.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        if config.rules.dir.is_relative() {
            config.rules.dir = cwd.join(&config.rules.dir);
        }

        config
    }

    /// Load user config from `~/.diagtree/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = diagtree_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.diagtree/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&cwd.join(".diagtree").join("config.toml"))
    }

    /// Load a config file that may legitimately be absent.
    ///
    /// An unreadable or invalid file is reported and skipped.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| DiagError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| DiagError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // DIAGTREE_RULES_DIR
        if let Ok(val) = env::var("DIAGTREE_RULES_DIR") {
            if val.is_empty() {
                tracing::warn!("DIAGTREE_RULES_DIR is empty, keeping '{}'", self.rules.dir.display());
            } else {
                self.rules.dir = PathBuf::from(val);
            }
        }

        // DIAGTREE_SEED
        if let Ok(val) = env::var("DIAGTREE_SEED") {
            match val.parse::<u64>() {
                Ok(n) => self.engine.seed = Some(n),
                Err(_) => tracing::warn!(
                    "Invalid DIAGTREE_SEED value '{}'. Expected a non-negative integer. \
                    Running unseeded.",
                    val
                ),
            }
        }

        // DIAGTREE_HISTORY_TAIL
        if let Ok(val) = env::var("DIAGTREE_HISTORY_TAIL") {
            match val.parse::<usize>() {
                Ok(n) if EngineConfig::is_valid_history_tail(n) => self.engine.history_tail = n,
                Ok(n) => tracing::warn!(
                    "Invalid DIAGTREE_HISTORY_TAIL value '{}'. Must be {}..={}. Using '{}'.",
                    n,
                    MIN_HISTORY_TAIL,
                    MAX_HISTORY_TAIL,
                    self.engine.history_tail
                ),
                Err(_) => tracing::warn!(
                    "Invalid DIAGTREE_HISTORY_TAIL value '{}'. Expected a positive integer. \
                    Using '{}'.",
                    val,
                    self.engine.history_tail
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Non-default fields from `other` win, field by field. Subgroup entries
    /// are merged by id. A layer cannot reset a value back to its default.
    fn merge(mut self, other: Config) -> Self {
        let default_rules = RulesConfig::default();
        if other.rules.dir != default_rules.dir {
            self.rules.dir = other.rules.dir;
        }
        if other.rules.ingroup_file != default_rules.ingroup_file {
            self.rules.ingroup_file = other.rules.ingroup_file;
        }
        if other.rules.crossgroup_file != default_rules.crossgroup_file {
            self.rules.crossgroup_file = other.rules.crossgroup_file;
        }
        if other.rules.diagnosis_file != default_rules.diagnosis_file {
            self.rules.diagnosis_file = other.rules.diagnosis_file;
        }
        if other.rules.topic_file != default_rules.topic_file {
            self.rules.topic_file = other.rules.topic_file;
        }

        let default_engine = EngineConfig::default();
        if other.engine.seed.is_some() {
            self.engine.seed = other.engine.seed;
        }
        if other.engine.history_tail != default_engine.history_tail {
            if EngineConfig::is_valid_history_tail(other.engine.history_tail) {
                self.engine.history_tail = other.engine.history_tail;
            } else {
                tracing::warn!(
                    "Invalid history_tail {} in config. Must be {}..={}.",
                    other.engine.history_tail,
                    MIN_HISTORY_TAIL,
                    MAX_HISTORY_TAIL
                );
            }
        }
        if other.engine.initial_time != default_engine.initial_time {
            self.engine.initial_time = other.engine.initial_time;
        }
        if other.engine.followup_time != default_engine.followup_time {
            self.engine.followup_time = other.engine.followup_time;
        }

        for (id, subgroup) in other.subgroups {
            self.subgroups.insert(id, subgroup);
        }

        self
    }

    /// Built-in subgroup catalog with configured entries applied.
    pub fn registry(&self) -> Result<SubgroupRegistry> {
        SubgroupRegistry::builtin().with_overrides(&self.subgroups)
    }
}

/// Get the diagtree home directory.
///
/// Checks `DIAGTREE_HOME` first, then falls back to `~/.diagtree`.
pub fn diagtree_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("DIAGTREE_HOME") {
        if home.is_empty() {
            tracing::warn!("DIAGTREE_HOME is empty, using default");
        } else {
            return Some(PathBuf::from(home));
        }
    }

    dirs::home_dir().map(|home| home.join(".diagtree"))
}
