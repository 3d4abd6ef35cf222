//! Rule reliability estimation without ground truth.
//!
//! An EM-style fixed point over the vote matrix:
//! - E-step: per-item posterior from the current weights ([`Posterior`]).
//! - M-step: each rule's weight becomes its smoothed rate of agreement with
//!   those posteriors, `(agree + α) / (votes + 2α)`.
//!
//! Iteration stops when no weight moves by more than `tolerance`, or at
//! `max_iterations`. Each step is computed in parallel and fully collected
//! before the next starts, so results are bit-for-bit reproducible.

mod profile;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::class::Class;
use crate::error::ConfigurationError;
use crate::matrix::VoteMatrix;
use crate::posterior::Posterior;

pub use profile::{DegenerateClass, ReliabilityProfile, RuleReliability, RuleStatus};

/// Estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Iteration cap.
    pub max_iterations: usize,
    /// Convergence threshold on the largest weight change.
    pub tolerance: f64,
    /// Laplace pseudo-count added to both agreement and disagreement.
    pub pseudo_count: f64,
    /// Weight every informative rule starts from.
    pub initial_weight: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-4,
            pseudo_count: 1.0,
            initial_weight: 1.0,
        }
    }
}

impl EstimatorConfig {
    /// Checks every parameter.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_iterations == 0 {
            return Err(ConfigurationError::invalid("max_iterations", "must be at least 1"));
        }
        for (name, value) in [
            ("tolerance", self.tolerance),
            ("pseudo_count", self.pseudo_count),
            ("initial_weight", self.initial_weight),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigurationError::invalid(
                    name,
                    format!("must be a positive finite number, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Iterative reliability estimator.
#[derive(Debug, Clone)]
pub struct ReliabilityEstimator {
    config: EstimatorConfig,
}

impl Default for ReliabilityEstimator {
    fn default() -> Self {
        Self {
            config: EstimatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RuleUpdate {
    weight: f64,
    accuracy_when_positive: Option<f64>,
    accuracy_when_negative: Option<f64>,
}

impl ReliabilityEstimator {
    /// Creates an estimator with validated configuration.
    pub fn new(config: EstimatorConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimates every rule's reliability from the vote matrix alone.
    #[must_use]
    pub fn estimate(&self, matrix: &VoteMatrix) -> ReliabilityProfile {
        let n_rules = matrix.n_rules();
        let alpha = self.config.pseudo_count;

        let informative: Vec<bool> = (0..n_rules)
            .map(|j| matrix.column(j).any(|v| !v.is_abstain()))
            .collect();
        let mut weights: Vec<f64> = informative
            .iter()
            .map(|&inf| if inf { self.config.initial_weight } else { 0.0 })
            .collect();
        let mut updates: Vec<Option<RuleUpdate>> = vec![None; n_rules];

        let mut iterations = 0;
        let mut max_delta = 0.0_f64;
        let mut converged = !informative.contains(&true);

        while !converged && iterations < self.config.max_iterations {
            iterations += 1;

            let posteriors: Vec<Posterior> = (0..matrix.n_items())
                .into_par_iter()
                .map(|i| Posterior::from_votes(matrix.row(i), &weights))
                .collect();

            updates = (0..n_rules)
                .into_par_iter()
                .map(|j| m_step(matrix, j, &posteriors, alpha))
                .collect();

            max_delta = updates
                .iter()
                .zip(&weights)
                .filter_map(|(u, old)| u.map(|u| (u.weight - old).abs()))
                .fold(0.0, f64::max);
            weights = updates
                .iter()
                .map(|u| u.map_or(0.0, |u| u.weight))
                .collect();

            debug!(iteration = iterations, max_delta, "reliability iteration");
            converged = max_delta < self.config.tolerance;
        }

        let rules = matrix
            .columns()
            .iter()
            .zip(&updates)
            .enumerate()
            .map(|(j, (column, update))| match update {
                Some(u) => RuleReliability {
                    rule: column.name.clone(),
                    polarity: column.polarity,
                    votes: matrix.column(j).filter(|v| !v.is_abstain()).count(),
                    weight: Some(u.weight),
                    accuracy_when_positive: u.accuracy_when_positive,
                    accuracy_when_negative: u.accuracy_when_negative,
                    status: RuleStatus::Informative,
                },
                None => RuleReliability::uninformative(column.name.clone(), column.polarity),
            })
            .collect();

        let degenerate_classes = Class::PREDICTED
            .iter()
            .filter(|class| matrix.class_votes(**class) == 0)
            .map(|class| DegenerateClass {
                class: *class,
                registered_rules: matrix
                    .columns()
                    .iter()
                    .filter(|c| c.polarity.class() == *class)
                    .count(),
            })
            .collect();

        info!(iterations, converged, max_delta, rules = n_rules, "reliability estimated");

        ReliabilityProfile {
            rules,
            iterations,
            converged,
            max_delta,
            degenerate_classes,
        }
    }
}

fn m_step(matrix: &VoteMatrix, rule: usize, posteriors: &[Posterior], alpha: f64) -> Option<RuleUpdate> {
    let mut agree = [0.0_f64; 2];
    let mut count = [0_usize; 2];
    for (item, vote) in matrix.column(rule).enumerate() {
        let k = match vote {
            Class::Positive => 0,
            Class::Negative => 1,
            Class::Abstain => continue,
        };
        agree[k] += posteriors[item].of(vote);
        count[k] += 1;
    }

    let total = count[0] + count[1];
    if total == 0 {
        return None;
    }

    let smooth = |a: f64, n: usize| (a + alpha) / (n as f64 + 2.0 * alpha);
    Some(RuleUpdate {
        weight: smooth(agree[0] + agree[1], total),
        accuracy_when_positive: (count[0] > 0).then(|| smooth(agree[0], count[0])),
        accuracy_when_negative: (count[1] > 0).then(|| smooth(agree[1], count[1])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Polarity;
    use crate::item::ItemId;
    use crate::matrix::RuleColumn;

    use crate::class::Class::{Abstain as A, Negative as N, Positive as P};

    fn matrix(columns: &[(&str, Polarity)], rows: &[&[Class]]) -> VoteMatrix {
        let ids = (0..rows.len()).map(|i| ItemId::new(format!("i{i}"))).collect();
        let columns = columns.iter().map(|(n, p)| RuleColumn::new(*n, *p)).collect();
        let votes = rows.iter().flat_map(|r| r.iter().copied()).collect();
        VoteMatrix::from_votes(ids, columns, votes).unwrap()
    }

    #[test]
    fn config_validation() {
        assert!(EstimatorConfig::default().validate().is_ok());
        let bad = EstimatorConfig {
            pseudo_count: 0.0,
            ..EstimatorConfig::default()
        };
        assert!(matches!(
            ReliabilityEstimator::new(bad),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
        let bad = EstimatorConfig {
            max_iterations: 0,
            ..EstimatorConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = EstimatorConfig {
            tolerance: f64::NAN,
            ..EstimatorConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn single_contested_item_yields_equal_weights() {
        let m = matrix(&[("p", Polarity::Positive), ("n", Polarity::Negative)], &[&[P, N]]);
        let profile = ReliabilityEstimator::default().estimate(&m);
        assert!(profile.converged());
        // agree = 0.5 on one vote: (0.5 + 1) / (1 + 2)
        assert_eq!(profile.rules()[0].weight, Some(0.5));
        assert_eq!(profile.rules()[1].weight, Some(0.5));
    }

    #[test]
    fn dissenting_rule_is_down_weighted() {
        let m = matrix(
            &[
                ("p1", Polarity::Positive),
                ("p2", Polarity::Positive),
                ("n", Polarity::Negative),
            ],
            &[&[P, P, N], &[P, P, N], &[P, A, A], &[A, P, A]],
        );
        let profile = ReliabilityEstimator::default().estimate(&m);
        let p1 = profile.get("p1").unwrap().weight.unwrap();
        let n = profile.get("n").unwrap().weight.unwrap();
        assert!(p1 > n, "p1={p1} n={n}");
        assert!(profile.get("n").unwrap().accuracy_when_positive.is_none());
        assert!(profile.get("n").unwrap().accuracy_when_negative.is_some());
    }

    #[test]
    fn silent_rule_is_uninformative() {
        let m = matrix(
            &[("p", Polarity::Positive), ("quiet", Polarity::Negative)],
            &[&[P, A], &[A, A]],
        );
        let profile = ReliabilityEstimator::default().estimate(&m);
        let quiet = profile.get("quiet").unwrap();
        assert!(quiet.is_uninformative());
        assert_eq!(quiet.weight, None);
        assert_eq!(quiet.effective_weight(), 0.0);
        assert_eq!(profile.weights()[1], 0.0);
    }

    #[test]
    fn degenerate_class_is_reported_with_registered_rules() {
        let m = matrix(
            &[("p", Polarity::Positive), ("quiet", Polarity::Negative)],
            &[&[P, A]],
        );
        let profile = ReliabilityEstimator::default().estimate(&m);
        assert_eq!(
            profile.degenerate_classes(),
            &[DegenerateClass {
                class: Class::Negative,
                registered_rules: 1
            }]
        );
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let m = matrix(
            &[("p", Polarity::Positive), ("n", Polarity::Negative)],
            &[&[P, A], &[P, N], &[A, N], &[P, A]],
        );
        let config = EstimatorConfig {
            max_iterations: 1,
            tolerance: 1e-12,
            ..EstimatorConfig::default()
        };
        let profile = ReliabilityEstimator::new(config).unwrap().estimate(&m);
        assert_eq!(profile.iterations(), 1);
        assert!(!profile.converged());
        assert!(profile
            .warnings()
            .iter()
            .any(|w| matches!(w, crate::error::BatchWarning::NonConvergence { iterations: 1, .. })));
    }

    #[test]
    fn all_silent_matrix_converges_trivially() {
        let m = matrix(&[("p", Polarity::Positive)], &[&[A], &[A]]);
        let profile = ReliabilityEstimator::default().estimate(&m);
        assert!(profile.converged());
        assert_eq!(profile.iterations(), 0);
        assert!(profile.rules()[0].is_uninformative());
    }

    #[test]
    fn estimate_is_deterministic() {
        let m = matrix(
            &[("p", Polarity::Positive), ("n", Polarity::Negative), ("q", Polarity::Positive)],
            &[&[P, N, A], &[P, A, P], &[A, N, P], &[A, N, A], &[P, N, P]],
        );
        let estimator = ReliabilityEstimator::default();
        let a = estimator.estimate(&m);
        let b = estimator.estimate(&m);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
