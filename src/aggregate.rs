//! Final label assignment.
//!
//! Posteriors use the converged weights with the same formula as the
//! estimator's E-step. The tie-break prefers ABSTAIN over a low-confidence
//! guess: a class is assigned only when its posterior strictly exceeds the
//! other's by at least `margin`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::class::Class;
use crate::error::{ConfigurationError, ValidationError};
use crate::item::ItemId;
use crate::matrix::VoteMatrix;
use crate::posterior::Posterior;
use crate::reliability::ReliabilityProfile;

/// Aggregator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Minimum posterior gap required to assign a class, in `[0, 1)`.
    /// Zero means any strict majority.
    pub margin: f64,

    /// Abstain on every item when a class whose rules are registered never
    /// received a vote in the batch.
    pub collapse_degenerate_classes: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            margin: 0.0,
            collapse_degenerate_classes: true,
        }
    }
}

impl AggregatorConfig {
    /// Checks the margin range.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.margin.is_finite() && (0.0..1.0).contains(&self.margin)) {
            return Err(ConfigurationError::invalid(
                "margin",
                format!("must lie in [0, 1), got {}", self.margin),
            ));
        }
        Ok(())
    }
}

/// The engine's output for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Id of the labeled item.
    pub item_id: ItemId,
    /// Assigned class; `Abstain` only through the tie-break.
    pub predicted_class: Class,
    /// Posterior mass on POSITIVE.
    pub posterior_positive: f64,
    /// Posterior mass on NEGATIVE.
    pub posterior_negative: f64,
    /// True when the tie-break (or a degenerate batch) produced ABSTAIN.
    pub abstained: bool,
    /// No rule voted on the item, or the estimator did not converge.
    pub low_confidence: bool,
}

impl LabelRecord {
    /// Export name of the predicted class (`NEUTRAL` for abstentions).
    #[must_use]
    pub fn label_class(&self) -> &'static str {
        self.predicted_class.export_name()
    }
}

/// Combines votes and weights into labels.
#[derive(Debug, Clone, Default)]
pub struct LabelAggregator {
    config: AggregatorConfig,
}

impl LabelAggregator {
    /// Creates an aggregator with validated configuration.
    pub fn new(config: AggregatorConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Applies the tie-break policy to one posterior.
    #[must_use]
    pub fn decide(&self, posterior: &Posterior) -> Class {
        if posterior.degenerate {
            return Class::Abstain;
        }
        let gap = posterior.positive - posterior.negative;
        if gap > 0.0 && gap >= self.config.margin {
            Class::Positive
        } else if -gap > 0.0 && -gap >= self.config.margin {
            Class::Negative
        } else {
            Class::Abstain
        }
    }

    /// Labels every item of the matrix. Neither input is modified.
    ///
    /// # Errors
    /// `ProfileMismatch` or `ProfileRuleMismatch` if the profile was estimated
    /// for a different rule set.
    pub fn aggregate(
        &self,
        matrix: &VoteMatrix,
        profile: &ReliabilityProfile,
    ) -> Result<Vec<LabelRecord>, ValidationError> {
        if profile.rules().len() != matrix.n_rules() {
            return Err(ValidationError::ProfileMismatch {
                profile_rules: profile.rules().len(),
                matrix_rules: matrix.n_rules(),
            });
        }
        for (index, (rule, column)) in profile.rules().iter().zip(matrix.columns()).enumerate() {
            if rule.rule != column.name || rule.polarity != column.polarity {
                return Err(ValidationError::ProfileRuleMismatch {
                    index,
                    profile_rule: format!("{} ({})", rule.rule, rule.polarity),
                    matrix_rule: format!("{} ({})", column.name, column.polarity),
                });
            }
        }

        let weights = profile.weights();
        let collapse = self.config.collapse_degenerate_classes
            && profile
                .degenerate_classes()
                .iter()
                .any(|d| d.registered_rules > 0);
        let batch_low_confidence = collapse || !profile.converged();

        let records: Vec<LabelRecord> = (0..matrix.n_items())
            .into_par_iter()
            .map(|i| {
                let posterior = Posterior::from_votes(matrix.row(i), &weights);
                let predicted_class = if collapse {
                    Class::Abstain
                } else {
                    self.decide(&posterior)
                };
                LabelRecord {
                    item_id: matrix.item_ids()[i].clone(),
                    predicted_class,
                    posterior_positive: posterior.positive,
                    posterior_negative: posterior.negative,
                    abstained: predicted_class.is_abstain(),
                    low_confidence: batch_low_confidence || posterior.degenerate,
                }
            })
            .collect();

        info!(
            items = records.len(),
            abstained = records.iter().filter(|r| r.abstained).count(),
            collapsed = collapse,
            "labels aggregated"
        );
        Ok(records)
    }
}
