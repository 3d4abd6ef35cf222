use std::collections::HashSet;

use crate::class::Polarity;
use crate::error::ConfigurationError;
use crate::rule::Rule;

/// An ordered set of uniquely named rules.
///
/// Registration order defines the vote matrix column order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    names: HashSet<String>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rule set, rejecting empty input and duplicate names.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigurationError> {
        let mut set = Self::new();
        for rule in rules {
            set.register(rule)?;
        }
        set.ensure_not_empty()?;
        Ok(set)
    }

    /// Registers a rule.
    ///
    /// # Errors
    /// - `EmptyRuleName` for a blank name.
    /// - `DuplicateRuleName` if the name is already registered.
    pub fn register(&mut self, rule: Rule) -> Result<(), ConfigurationError> {
        if rule.name().trim().is_empty() {
            return Err(ConfigurationError::EmptyRuleName);
        }
        if !self.names.insert(rule.name().to_string()) {
            return Err(ConfigurationError::DuplicateRuleName {
                name: rule.name().to_string(),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, rule: Rule) -> Result<Self, ConfigurationError> {
        self.register(rule)?;
        Ok(self)
    }

    /// Fails with `EmptyRuleSet` if no rule is registered.
    pub fn ensure_not_empty(&self) -> Result<(), ConfigurationError> {
        if self.rules.is_empty() {
            Err(ConfigurationError::EmptyRuleSet)
        } else {
            Ok(())
        }
    }

    /// Registered rules in order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Looks a rule up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Number of rules with the given polarity.
    #[must_use]
    pub fn count_polarity(&self, polarity: Polarity) -> usize {
        self.rules.iter().filter(|r| r.polarity() == polarity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;

    fn abstainer(name: &str, polarity: Polarity) -> Rule {
        Rule::new(name, polarity, |_| Class::Abstain)
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = RuleSet::from_rules([
            abstainer("a", Polarity::Positive),
            abstainer("a", Polarity::Negative),
        ])
        .unwrap_err();
        match err {
            ConfigurationError::DuplicateRuleName { name } => assert_eq!(name, "a"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_set_is_rejected() {
        let err = RuleSet::from_rules(Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyRuleSet));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = RuleSet::new().with(abstainer("  ", Polarity::Positive)).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyRuleName));
    }

    #[test]
    fn keeps_registration_order() {
        let set = RuleSet::new()
            .with(abstainer("z", Polarity::Negative))
            .unwrap()
            .with(abstainer("a", Polarity::Positive))
            .unwrap();
        let names: Vec<&str> = set.rules().iter().map(Rule::name).collect();
        assert_eq!(names, vec!["z", "a"]);
        assert_eq!(set.count_polarity(Polarity::Positive), 1);
        assert!(set.get("z").is_some());
        assert!(set.get("missing").is_none());
    }
}
