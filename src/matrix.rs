//! Dense items × rules vote matrix.
//!
//! Cells are evaluated in parallel across items. A rule that fails or panics on
//! an item yields ABSTAIN for that cell only; the fault is recorded.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::class::{Class, Polarity};
use crate::error::{ConfigurationError, ValidationError};
use crate::item::{Item, ItemId};
use crate::rule::{Rule, RuleFault, RuleSet};

/// Column header of the vote matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleColumn {
    /// Rule name.
    pub name: String,
    /// Rule polarity.
    pub polarity: Polarity,
}

impl RuleColumn {
    /// Creates a column header.
    #[must_use]
    pub fn new(name: impl Into<String>, polarity: Polarity) -> Self {
        Self {
            name: name.into(),
            polarity,
        }
    }
}

/// A cell whose rule failed and was recorded as ABSTAIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFaultRecord {
    /// Row of the faulted cell.
    pub item_index: usize,
    /// Id of the item.
    pub item_id: ItemId,
    /// Column of the faulted cell.
    pub rule_index: usize,
    /// Rule name.
    pub rule: String,
    /// Fault message.
    pub message: String,
}

/// Votes of every rule on every item, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteMatrix {
    item_ids: Vec<ItemId>,
    columns: Vec<RuleColumn>,
    votes: Vec<Class>,
    faults: Vec<RuleFaultRecord>,
}

impl VoteMatrix {
    /// Applies every rule to every item.
    ///
    /// # Errors
    /// `EmptyItemSet` or `EmptyRuleSet` before any rule runs.
    pub fn build(items: &[Item], rules: &RuleSet) -> Result<Self, ConfigurationError> {
        if items.is_empty() {
            return Err(ConfigurationError::EmptyItemSet);
        }
        rules.ensure_not_empty()?;

        let rows: Vec<(Vec<Class>, Vec<RuleFaultRecord>)> = items
            .par_iter()
            .enumerate()
            .map(|(item_index, item)| evaluate_row(item_index, item, rules.rules()))
            .collect();

        let mut votes = Vec::with_capacity(items.len() * rules.len());
        let mut faults = Vec::new();
        for (row, row_faults) in rows {
            votes.extend(row);
            faults.extend(row_faults);
        }

        for fault in &faults {
            warn!(
                rule = %fault.rule,
                item = %fault.item_id,
                error = %fault.message,
                "rule fault recorded as abstain"
            );
        }
        debug!(
            items = items.len(),
            rules = rules.len(),
            faults = faults.len(),
            "vote matrix built"
        );

        Ok(Self {
            item_ids: items.iter().map(|i| i.id().clone()).collect(),
            columns: rules
                .rules()
                .iter()
                .map(|r| RuleColumn::new(r.name(), r.polarity()))
                .collect(),
            votes,
            faults,
        })
    }

    /// Builds a matrix from precomputed votes (row-major).
    ///
    /// # Errors
    /// - `DimensionMismatch` if `votes.len() != item_ids.len() * columns.len()`.
    /// - `VoteAgainstPolarity` if a vote contradicts its column's polarity.
    pub fn from_votes(
        item_ids: Vec<ItemId>,
        columns: Vec<RuleColumn>,
        votes: Vec<Class>,
    ) -> Result<Self, ValidationError> {
        let expected = item_ids.len() * columns.len();
        if votes.len() != expected {
            return Err(ValidationError::DimensionMismatch {
                expected,
                actual: votes.len(),
            });
        }
        if !columns.is_empty() {
            for (cell, vote) in votes.iter().enumerate() {
                let column = &columns[cell % columns.len()];
                if !column.polarity.admits(*vote) {
                    return Err(ValidationError::VoteAgainstPolarity {
                        rule: column.name.clone(),
                        polarity: column.polarity.to_string(),
                        vote: *vote,
                        item_index: cell / columns.len(),
                    });
                }
            }
        }
        Ok(Self {
            item_ids,
            columns,
            votes,
            faults: Vec::new(),
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn n_items(&self) -> usize {
        self.item_ids.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_rules(&self) -> usize {
        self.columns.len()
    }

    /// Row identifiers.
    #[must_use]
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    /// Column headers.
    #[must_use]
    pub fn columns(&self) -> &[RuleColumn] {
        &self.columns
    }

    /// Vote of rule `rule` on item `item`.
    ///
    /// # Panics
    /// If either index is out of bounds.
    #[must_use]
    pub fn get(&self, item: usize, rule: usize) -> Class {
        assert!(rule < self.n_rules(), "rule index out of bounds");
        self.votes[item * self.n_rules() + rule]
    }

    /// All votes on one item.
    #[must_use]
    pub fn row(&self, item: usize) -> &[Class] {
        let n = self.n_rules();
        &self.votes[item * n..(item + 1) * n]
    }

    /// Iterates over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Class]> + '_ {
        (0..self.n_items()).map(move |item| self.row(item))
    }

    /// All votes of one rule, top to bottom.
    pub fn column(&self, rule: usize) -> impl Iterator<Item = Class> + '_ {
        (0..self.n_items()).map(move |item| self.get(item, rule))
    }

    /// Cells that faulted during [`build`](Self::build).
    #[must_use]
    pub fn faults(&self) -> &[RuleFaultRecord] {
        &self.faults
    }

    /// Number of non-abstaining votes for `class` across the matrix.
    #[must_use]
    pub fn class_votes(&self, class: Class) -> usize {
        self.votes.iter().filter(|v| **v == class && !v.is_abstain()).count()
    }

    /// Stable digest of ids, columns and votes.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.n_items() as u64).to_le_bytes());
        hasher.update(&(self.n_rules() as u64).to_le_bytes());
        for id in &self.item_ids {
            hasher.update(id.as_str().as_bytes());
            hasher.update(&[0]);
        }
        for column in &self.columns {
            hasher.update(column.name.as_bytes());
            hasher.update(&[0, polarity_byte(column.polarity)]);
        }
        let cells: Vec<u8> = self.votes.iter().map(|v| class_byte(*v)).collect();
        hasher.update(&cells);
        hasher.finalize().to_hex().to_string()
    }
}

fn evaluate_row(
    item_index: usize,
    item: &Item,
    rules: &[Rule],
) -> (Vec<Class>, Vec<RuleFaultRecord>) {
    let mut row = Vec::with_capacity(rules.len());
    let mut faults = Vec::new();
    for (rule_index, rule) in rules.iter().enumerate() {
        match evaluate_cell(rule, item.normalized_text()) {
            Ok(vote) => row.push(vote),
            Err(fault) => {
                row.push(Class::Abstain);
                faults.push(RuleFaultRecord {
                    item_index,
                    item_id: item.id().clone(),
                    rule_index,
                    rule: rule.name().to_string(),
                    message: fault.message().to_string(),
                });
            }
        }
    }
    (row, faults)
}

fn evaluate_cell(rule: &Rule, text: &str) -> Result<Class, RuleFault> {
    match panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(text))) {
        Ok(result) => result,
        Err(payload) => Err(RuleFault::new(format!(
            "rule panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

const fn class_byte(class: Class) -> u8 {
    match class {
        Class::Positive => 1,
        Class::Negative => 2,
        Class::Abstain => 0,
    }
}

const fn polarity_byte(polarity: Polarity) -> u8 {
    match polarity {
        Polarity::Positive => 1,
        Polarity::Negative => 2,
    }
}
