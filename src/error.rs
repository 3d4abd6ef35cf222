//! Error types for labelfuse.
//!
//! Configuration problems are fatal and surface before any batch computation.
//! Everything that can go wrong *during* a batch degrades to ABSTAIN-biased
//! output plus a [`BatchWarning`] instead of an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::class::Class;

/// Fatal configuration errors, raised before a batch runs.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Two rules share a name.
    #[error("Rule '{name}' is registered more than once")]
    DuplicateRuleName {
        /// The repeated name.
        name: String,
    },

    /// A rule was registered with a blank name.
    #[error("Rule name cannot be empty")]
    EmptyRuleName,

    /// No rule is registered.
    #[error("Rule set is empty")]
    EmptyRuleSet,

    /// The batch has no items.
    #[error("Item set is empty")]
    EmptyItemSet,

    /// A tuning parameter is out of range.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A pattern rule's regex does not compile.
    #[error("Invalid pattern for rule '{rule}': {reason}")]
    InvalidPattern {
        /// Rule name.
        rule: String,
        /// Compiler message.
        reason: String,
    },

    /// A lexicon file could not be read.
    #[error("Failed to load lexicon '{path}': {message}")]
    Lexicon {
        /// Lexicon path.
        path: String,
        /// I/O error message.
        message: String,
    },

    /// A configuration file could not be read or parsed.
    #[error("Failed to read configuration: {message}")]
    ConfigFile {
        /// Read or parse error message.
        message: String,
    },

    /// A built-in rule name that does not exist.
    #[error("Unknown preset '{name}'")]
    UnknownPreset {
        /// The requested name.
        name: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid-parameter error.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from hand-built inputs to the lower-level APIs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The vote count does not match `items x rules`.
    #[error("Vote matrix has {actual} cells, expected {expected}")]
    DimensionMismatch {
        /// `items x rules`.
        expected: usize,
        /// Votes supplied.
        actual: usize,
    },

    /// A vote contradicts its column's polarity.
    #[error("Rule '{rule}' ({polarity}) cannot vote {vote} (item {item_index})")]
    VoteAgainstPolarity {
        /// Rule name.
        rule: String,
        /// Rule polarity.
        polarity: String,
        /// The offending vote.
        vote: Class,
        /// Row of the offending vote.
        item_index: usize,
    },

    /// The profile and the matrix have different numbers of rules.
    #[error("Reliability profile covers {profile_rules} rules, vote matrix has {matrix_rules}")]
    ProfileMismatch {
        /// Rules in the profile.
        profile_rules: usize,
        /// Columns in the matrix.
        matrix_rules: usize,
    },

    /// The profile and the matrix disagree on a column's rule.
    #[error("Column {index}: reliability profile has rule '{profile_rule}', vote matrix has '{matrix_rule}'")]
    ProfileRuleMismatch {
        /// Column index.
        index: usize,
        /// Rule name and polarity in the profile.
        profile_rule: String,
        /// Rule name and polarity in the matrix.
        matrix_rule: String,
    },
}

/// Top-level error type for labelfuse.
#[derive(Debug, Error)]
pub enum LabelError {
    /// Fatal configuration problem.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Inconsistent hand-built input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl LabelError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type alias for labelfuse operations.
pub type LabelResult<T> = Result<T, LabelError>;

/// Non-fatal conditions surfaced alongside batch output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchWarning {
    /// The estimator hit its iteration cap before converging.
    NonConvergence {
        /// Iterations performed.
        iterations: usize,
        /// Largest weight change in the final iteration.
        max_delta: f64,
    },

    /// A class received no non-abstaining vote across the whole batch.
    DegenerateClass {
        /// The silent class.
        class: Class,
        /// Rules registered with that polarity.
        registered_rules: usize,
    },

    /// Some (item, rule) cells faulted and were recorded as ABSTAIN.
    RuleFaults {
        /// Number of faulted cells.
        count: usize,
        /// Names of the rules that faulted, in registration order.
        rules: Vec<String>,
    },
}

impl std::fmt::Display for BatchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonConvergence { iterations, max_delta } => write!(
                f,
                "estimator did not converge after {iterations} iterations (max delta {max_delta:.2e})"
            ),
            Self::DegenerateClass { class, registered_rules } => write!(
                f,
                "class {class} received no votes ({registered_rules} rules registered)"
            ),
            Self::RuleFaults { count, rules } => {
                write!(f, "{count} rule faults in [{}]", rules.join(", "))
            }
        }
    }
}
