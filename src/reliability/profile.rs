use serde::{Deserialize, Serialize};

use crate::class::{Class, Polarity};
use crate::error::BatchWarning;

/// Whether a rule's reliability could be estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// The rule voted at least once.
    Informative,
    /// The rule abstained on every item; it has no weight.
    Uninformative,
}

/// Estimated reliability of one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleReliability {
    /// Rule name.
    pub rule: String,
    /// Rule polarity.
    pub polarity: Polarity,
    /// Non-abstaining votes cast in the batch.
    pub votes: usize,
    /// Smoothed agreement with the consensus; `None` when uninformative.
    pub weight: Option<f64>,
    /// Smoothed agreement over the rule's POSITIVE votes.
    pub accuracy_when_positive: Option<f64>,
    /// Smoothed agreement over the rule's NEGATIVE votes.
    pub accuracy_when_negative: Option<f64>,
    /// Informative or not.
    pub status: RuleStatus,
}

impl RuleReliability {
    pub(crate) fn uninformative(rule: String, polarity: Polarity) -> Self {
        Self {
            rule,
            polarity,
            votes: 0,
            weight: None,
            accuracy_when_positive: None,
            accuracy_when_negative: None,
            status: RuleStatus::Uninformative,
        }
    }

    /// Returns true if the rule never voted.
    #[must_use]
    pub fn is_uninformative(&self) -> bool {
        self.status == RuleStatus::Uninformative
    }

    /// Weight used in posteriors; uninformative rules contribute nothing.
    #[must_use]
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(0.0)
    }
}

/// A predicted class nobody voted for in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegenerateClass {
    /// The silent class.
    pub class: Class,
    /// Rules registered with that polarity.
    pub registered_rules: usize,
}

/// Per-rule reliability for one batch, plus how the estimate was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityProfile {
    pub(crate) rules: Vec<RuleReliability>,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
    pub(crate) max_delta: f64,
    pub(crate) degenerate_classes: Vec<DegenerateClass>,
}

impl ReliabilityProfile {
    /// Per-rule estimates, in vote-matrix column order.
    #[must_use]
    pub fn rules(&self) -> &[RuleReliability] {
        &self.rules
    }

    /// Looks a rule up by name.
    #[must_use]
    pub fn get(&self, rule: &str) -> Option<&RuleReliability> {
        self.rules.iter().find(|r| r.rule == rule)
    }

    /// Effective weights in column order.
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.rules.iter().map(RuleReliability::effective_weight).collect()
    }

    /// EM iterations performed.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// True if the weights settled below the tolerance before the cap.
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.converged
    }

    /// Largest weight change in the last iteration.
    #[must_use]
    pub const fn max_delta(&self) -> f64 {
        self.max_delta
    }

    /// Classes that received no vote in the batch.
    #[must_use]
    pub fn degenerate_classes(&self) -> &[DegenerateClass] {
        &self.degenerate_classes
    }

    /// Warnings implied by this profile.
    #[must_use]
    pub fn warnings(&self) -> Vec<BatchWarning> {
        let mut warnings = Vec::new();
        if !self.converged {
            warnings.push(BatchWarning::NonConvergence {
                iterations: self.iterations,
                max_delta: self.max_delta,
            });
        }
        warnings.extend(self.degenerate_classes.iter().map(|d| BatchWarning::DegenerateClass {
            class: d.class,
            registered_rules: d.registered_rules,
        }));
        warnings
    }

    /// Stable digest of rule names and weight bit patterns.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for r in &self.rules {
            hasher.update(r.rule.as_bytes());
            hasher.update(&[0]);
            for value in [r.weight, r.accuracy_when_positive, r.accuracy_when_negative] {
                let bits = value.map_or(u64::MAX, f64::to_bits);
                hasher.update(&bits.to_le_bytes());
            }
        }
        hasher.update(&(self.iterations as u64).to_le_bytes());
        hasher.update(&[u8::from(self.converged)]);
        hasher.finalize().to_hex().to_string()
    }
}
