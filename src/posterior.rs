//! Weighted-vote posterior shared by the estimator's E-step and the aggregator.

use serde::{Deserialize, Serialize};

use crate::class::Class;

/// Per-item distribution over the two predicted classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posterior {
    /// Mass on `Class::Positive`.
    pub positive: f64,
    /// Mass on `Class::Negative`.
    pub negative: f64,
    /// True when no weighted vote was cast on the item.
    pub degenerate: bool,
}

impl Posterior {
    /// The uniform posterior used when every rule abstains.
    pub const DEGENERATE: Self = Self {
        positive: 0.5,
        negative: 0.5,
        degenerate: true,
    };

    /// Sums `weights[j]` over rules voting each class, then normalizes.
    ///
    /// `row` and `weights` are zipped; rules without weight must carry `0.0`.
    #[must_use]
    pub fn from_votes(row: &[Class], weights: &[f64]) -> Self {
        let mut positive = 0.0_f64;
        let mut negative = 0.0_f64;
        for (vote, weight) in row.iter().zip(weights) {
            match vote {
                Class::Positive => positive += weight,
                Class::Negative => negative += weight,
                Class::Abstain => {}
            }
        }

        let total = positive + negative;
        if total > 0.0 && total.is_finite() {
            Self {
                positive: positive / total,
                negative: negative / total,
                degenerate: false,
            }
        } else {
            Self::DEGENERATE
        }
    }

    /// Mass on `class`; zero for `Abstain`.
    #[must_use]
    pub const fn of(&self, class: Class) -> f64 {
        match class {
            Class::Positive => self.positive,
            Class::Negative => self.negative,
            Class::Abstain => 0.0,
        }
    }
}
