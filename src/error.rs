//! Unified error types for diagtree.
//!
//! Rule-table defects are reported through dedicated variants so the caller
//! can tell a broken configuration apart from an I/O failure. None of them are
//! recovered silently: load-time errors abort construction of the rule store,
//! transition-time errors abort only the current `advance` call.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for diagtree operations.
#[derive(Error, Debug)]
pub enum DiagError {
    /// A required rule source was absent at load time.
    #[error("rule source missing: {source_name}")]
    ConfigMissing { source_name: String },

    /// A rule source was present but structurally invalid.
    #[error("malformed rule source {source_name}: {message}")]
    ConfigMalformed {
        source_name: String,
        message: String,
    },

    /// Lookup for a group/state that the rule store does not define.
    #[error("unknown state {state} in group {group}")]
    UnknownState { group: String, state: String },

    /// No branch is defined for the current position and response.
    #[error("invalid transition: {group}.{state} -> {branch}")]
    InvalidTransition {
        group: String,
        state: String,
        branch: String,
    },

    /// A cross-group rule points at an undefined group or state.
    #[error("cross rule {from} targets undefined {target}")]
    DanglingCrossRule { from: String, target: String },

    /// A subgroup id was reached that the registry does not know.
    #[error("unknown subgroup: {subgroup}")]
    UnknownSubgroup { subgroup: String },

    /// I/O errors from rule, config, or export files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for diagtree operations.
pub type Result<T> = std::result::Result<T, DiagError>;

impl DiagError {
    /// Create a missing rule source error.
    pub fn config_missing(source_name: impl Into<String>) -> Self {
        Self::ConfigMissing {
            source_name: source_name.into(),
        }
    }

    /// Create a malformed rule source error.
    pub fn config_malformed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigMalformed {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an unknown state error.
    pub fn unknown_state(group: impl Into<String>, state: impl Into<String>) -> Self {
        Self::UnknownState {
            group: group.into(),
            state: state.into(),
        }
    }

    /// Create an invalid transition error.
    pub fn invalid_transition(
        group: impl Into<String>,
        state: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            group: group.into(),
            state: state.into(),
            branch: branch.into(),
        }
    }

    /// Create a dangling cross rule error.
    pub fn dangling_cross_rule(from: impl Into<String>, target: impl Into<String>) -> Self {
        Self::DanglingCrossRule {
            from: from.into(),
            target: target.into(),
        }
    }

    /// Create an unknown subgroup error.
    pub fn unknown_subgroup(subgroup: impl Into<String>) -> Self {
        Self::UnknownSubgroup {
            subgroup: subgroup.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check whether this error stems from a defective rule table.
    ///
    /// Rule errors mean the interview cannot continue until the tables are
    /// corrected; everything else is an infrastructure failure.
    pub fn is_rule_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing { .. }
                | Self::ConfigMalformed { .. }
                | Self::UnknownState { .. }
                | Self::InvalidTransition { .. }
                | Self::DanglingCrossRule { .. }
                | Self::UnknownSubgroup { .. }
        )
    }
}

impl From<io::Error> for DiagError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for DiagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Exit codes for the diagtree CLI.
pub mod exit_codes {
    /// Command completed.
    pub const OK: i32 = 0;

    /// Infrastructure failure (I/O, config).
    pub const FAILURE: i32 = 1;

    /// The rule tables are missing, malformed, or reference undefined states.
    pub const RULE_ERROR: i32 = 2;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
