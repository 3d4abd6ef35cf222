//! Heuristic labeling rules.
//!
//! A rule is a named, polarized, pure function from normalized text to a
//! [`Class`]. Word-list and regex rules are just different closures; there is
//! no rule hierarchy.

mod lexicon;
pub mod presets;
mod set;

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::class::{Class, Polarity};
use crate::error::ConfigurationError;

pub use lexicon::Lexicon;
pub use set::RuleSet;

/// Failure of one rule on one item. Recorded, then treated as ABSTAIN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RuleFault {
    message: String,
}

impl RuleFault {
    /// Creates a fault with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The fault message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Signature of a rule body.
pub type RuleFn = dyn Fn(&str) -> Result<Class, RuleFault> + Send + Sync;

/// A registered labeling rule.
#[derive(Clone)]
pub struct Rule {
    name: String,
    polarity: Polarity,
    apply: Arc<RuleFn>,
}

impl Rule {
    /// Creates an infallible rule.
    pub fn new<F>(name: impl Into<String>, polarity: Polarity, f: F) -> Self
    where
        F: Fn(&str) -> Class + Send + Sync + 'static,
    {
        Self::fallible(name, polarity, move |text| Ok(f(text)))
    }

    /// Creates a rule that may fail on individual items.
    pub fn fallible<F>(name: impl Into<String>, polarity: Polarity, f: F) -> Self
    where
        F: Fn(&str) -> Result<Class, RuleFault> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            polarity,
            apply: Arc::new(f),
        }
    }

    /// Votes `polarity` when any whitespace token of the text is in `lexicon`.
    pub fn keywords(name: impl Into<String>, polarity: Polarity, lexicon: Arc<Lexicon>) -> Self {
        let vote = polarity.class();
        Self::new(name, polarity, move |text| {
            if text.split_whitespace().any(|word| lexicon.contains(word)) {
                vote
            } else {
                Class::Abstain
            }
        })
    }

    /// Votes `polarity` when `pattern` matches anywhere in the text.
    ///
    /// Patterns are compiled once, case-insensitively.
    pub fn pattern(
        name: impl Into<String>,
        polarity: Polarity,
        pattern: &str,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let re = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigurationError::InvalidPattern {
                rule: name.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_regex(name, polarity, re))
    }

    fn from_regex(name: String, polarity: Polarity, re: Regex) -> Self {
        let vote = polarity.class();
        Self::new(name, polarity, move |text| {
            if re.is_match(text) {
                vote
            } else {
                Class::Abstain
            }
        })
    }

    /// Rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rule polarity.
    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Applies the rule to normalized text.
    ///
    /// A vote that contradicts the rule's polarity is reported as a fault.
    pub fn evaluate(&self, normalized_text: &str) -> Result<Class, RuleFault> {
        let vote = (self.apply)(normalized_text)?;
        if self.polarity.admits(vote) {
            Ok(vote)
        } else {
            Err(RuleFault::new(format!(
                "{} rule voted {vote}",
                self.polarity
            )))
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("polarity", &self.polarity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_rule_votes_on_any_token() {
        let lexicon = Arc::new(Lexicon::from_words("good_verbs", ["sobe", "dispara"]));
        let rule = Rule::keywords("good_verbs", Polarity::Positive, lexicon);
        assert_eq!(rule.evaluate("vale dispara hoje").unwrap(), Class::Positive);
        assert_eq!(rule.evaluate("vale cai hoje").unwrap(), Class::Abstain);
        assert_eq!(rule.evaluate("").unwrap(), Class::Abstain);
    }

    #[test]
    fn keyword_rule_matches_whole_tokens_only() {
        let lexicon = Arc::new(Lexicon::from_words("bad", ["cai"]));
        let rule = Rule::keywords("bad", Polarity::Negative, lexicon);
        assert_eq!(rule.evaluate("caixa sobe").unwrap(), Class::Abstain);
    }

    #[test]
    fn pattern_rule_is_case_insensitive() {
        let rule = Rule::pattern("up", Polarity::Positive, "fech.*alta").unwrap();
        assert_eq!(rule.evaluate("Ibovespa FECHA em ALTA").unwrap(), Class::Positive);
        assert_eq!(rule.evaluate("ibovespa fecha em queda").unwrap(), Class::Abstain);
    }

    #[test]
    fn invalid_pattern_is_configuration_error() {
        let err = Rule::pattern("broken", Polarity::Negative, "(unclosed").unwrap_err();
        match err {
            ConfigurationError::InvalidPattern { rule, .. } => assert_eq!(rule, "broken"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn vote_against_polarity_is_fault() {
        let rule = Rule::new("confused", Polarity::Positive, |_| Class::Negative);
        let fault = rule.evaluate("x").unwrap_err();
        assert!(fault.message().contains("NEGATIVE"));
    }

    #[test]
    fn fallible_rule_propagates_fault() {
        let rule = Rule::fallible("picky", Polarity::Negative, |text| {
            if text.is_empty() {
                Err(RuleFault::new("empty input"))
            } else {
                Ok(Class::Abstain)
            }
        });
        assert_eq!(rule.evaluate("").unwrap_err().message(), "empty input");
        assert_eq!(rule.evaluate("a").unwrap(), Class::Abstain);
    }
}
