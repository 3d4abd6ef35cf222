//! Per-rule coverage, overlap and agreement statistics.
//!
//! Read-only: nothing here feeds back into aggregation. The report exists so
//! an operator can spot a rule that is redundant, too sparse or adversarial.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::class::Polarity;
use crate::matrix::VoteMatrix;

/// Statistics for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    /// Rule polarity.
    pub polarity: Polarity,
    /// Non-abstaining votes.
    pub votes: usize,
    /// Fraction of items the rule voted on.
    pub coverage: f64,
    /// Fraction of items where this rule and at least one other voted.
    pub overlaps: f64,
    /// Fraction of items where this rule and another voted different classes.
    pub conflicts: f64,
    /// Cells of this rule that faulted and were recorded as ABSTAIN.
    pub faults: usize,
    /// Agreement rate with every other rule, over items where both voted.
    /// `None` when the two never voted on the same item.
    pub agreement: BTreeMap<String, Option<f64>>,
}

/// Diagnostics for a whole vote matrix, keyed by rule name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    /// Items in the batch.
    pub items: usize,
    /// Fraction of items with at least one vote.
    pub coverage: f64,
    /// Per-rule statistics.
    pub rules: BTreeMap<String, RuleStats>,
}

impl DiagnosticsReport {
    /// Looks a rule up by name.
    #[must_use]
    pub fn get(&self, rule: &str) -> Option<&RuleStats> {
        self.rules.get(rule)
    }

    /// Rules whose coverage is below `min_coverage`.
    #[must_use]
    pub fn sparse_rules(&self, min_coverage: f64) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|(_, s)| s.coverage < min_coverage)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Summarizes a vote matrix.
#[must_use]
pub fn summarize(matrix: &VoteMatrix) -> DiagnosticsReport {
    let n_items = matrix.n_items();
    let n_rules = matrix.n_rules();
    let fraction = |count: usize| {
        if n_items == 0 {
            0.0
        } else {
            count as f64 / n_items as f64
        }
    };

    let stats: Vec<(String, RuleStats)> = (0..n_rules)
        .into_par_iter()
        .map(|j| {
            let mut votes = 0;
            let mut overlaps = 0;
            let mut conflicts = 0;
            let mut both = vec![0_usize; n_rules];
            let mut agree = vec![0_usize; n_rules];

            for row in matrix.rows() {
                let vote = row[j];
                if vote.is_abstain() {
                    continue;
                }
                votes += 1;
                let mut overlapped = false;
                let mut conflicted = false;
                for (k, other) in row.iter().enumerate() {
                    if k == j || other.is_abstain() {
                        continue;
                    }
                    overlapped = true;
                    both[k] += 1;
                    if *other == vote {
                        agree[k] += 1;
                    } else {
                        conflicted = true;
                    }
                }
                overlaps += usize::from(overlapped);
                conflicts += usize::from(conflicted);
            }

            let agreement = matrix
                .columns()
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != j)
                .map(|(k, column)| {
                    let rate = (both[k] > 0).then(|| agree[k] as f64 / both[k] as f64);
                    (column.name.clone(), rate)
                })
                .collect();

            let column = &matrix.columns()[j];
            (
                column.name.clone(),
                RuleStats {
                    polarity: column.polarity,
                    votes,
                    coverage: fraction(votes),
                    overlaps: fraction(overlaps),
                    conflicts: fraction(conflicts),
                    faults: matrix.faults().iter().filter(|f| f.rule_index == j).count(),
                    agreement,
                },
            )
        })
        .collect();

    let covered = matrix
        .rows()
        .filter(|row| row.iter().any(|v| !v.is_abstain()))
        .count();

    DiagnosticsReport {
        items: n_items,
        coverage: fraction(covered),
        rules: stats.into_iter().collect(),
    }
}

impl fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rules.keys().map(String::len).max().unwrap_or(4).max(4);
        writeln!(
            f,
            "{:<width$}  {:<8}  {:>6}  {:>8}  {:>8}  {:>9}  {:>6}",
            "rule", "polarity", "votes", "coverage", "overlaps", "conflicts", "faults"
        )?;
        for (name, s) in &self.rules {
            writeln!(
                f,
                "{:<width$}  {:<8}  {:>6}  {:>8.3}  {:>8.3}  {:>9.3}  {:>6}",
                name,
                s.polarity.to_string(),
                s.votes,
                s.coverage,
                s.overlaps,
                s.conflicts,
                s.faults
            )?;
        }
        write!(f, "{} items, {:.3} covered by at least one rule", self.items, self.coverage)
    }
}
