//! Vote classes and rule polarity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A rule's vote for one item, and the aggregator's output label.
///
/// `Abstain` is the "no opinion" sentinel. It is only ever emitted as a final
/// label by the tie-break fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Class {
    /// Positive sentiment.
    Positive,
    /// Negative sentiment.
    Negative,
    /// No opinion.
    Abstain,
}

impl Class {
    /// The two classes a posterior is computed over.
    pub const PREDICTED: [Class; 2] = [Class::Positive, Class::Negative];

    /// Returns true for `Abstain`.
    #[must_use]
    pub const fn is_abstain(self) -> bool {
        matches!(self, Self::Abstain)
    }

    /// The opposite predicted class. `Abstain` maps to itself.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
            Self::Abstain => Self::Abstain,
        }
    }

    /// Export name used by persisted label files (`NEUTRAL` for abstentions).
    #[must_use]
    pub const fn export_name(self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Abstain => "NEUTRAL",
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "POSITIVE"),
            Self::Negative => write!(f, "NEGATIVE"),
            Self::Abstain => write!(f, "ABSTAIN"),
        }
    }
}

/// The class a rule leans toward. A rule votes its polarity or abstains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Rule votes `Class::Positive` when it fires.
    Positive,
    /// Rule votes `Class::Negative` when it fires.
    Negative,
}

impl Polarity {
    /// The class this polarity votes for.
    #[must_use]
    pub const fn class(self) -> Class {
        match self {
            Self::Positive => Class::Positive,
            Self::Negative => Class::Negative,
        }
    }

    /// Returns true if `vote` is admissible for this polarity.
    #[must_use]
    pub const fn admits(self, vote: Class) -> bool {
        matches!(
            (self, vote),
            (_, Class::Abstain) | (Self::Positive, Class::Positive) | (Self::Negative, Class::Negative)
        )
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_admits_own_class_and_abstain() {
        assert!(Polarity::Positive.admits(Class::Positive));
        assert!(Polarity::Positive.admits(Class::Abstain));
        assert!(!Polarity::Positive.admits(Class::Negative));
        assert!(Polarity::Negative.admits(Class::Negative));
        assert!(!Polarity::Negative.admits(Class::Positive));
    }

    #[test]
    fn export_names_follow_label_files() {
        assert_eq!(Class::Positive.export_name(), "POSITIVE");
        assert_eq!(Class::Negative.export_name(), "NEGATIVE");
        assert_eq!(Class::Abstain.export_name(), "NEUTRAL");
    }

    #[test]
    fn opposite() {
        assert_eq!(Class::Positive.opposite(), Class::Negative);
        assert_eq!(Class::Abstain.opposite(), Class::Abstain);
    }

    #[test]
    fn serde_is_snake_case() {
        let json = serde_json::to_string(&Class::Abstain).unwrap();
        assert_eq!(json, "\"abstain\"");
        let p: Polarity = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(p, Polarity::Negative);
    }
}
