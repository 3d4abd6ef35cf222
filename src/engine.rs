//! Batch labeling engine.
//!
//! One call to [`LabelingEngine::run`] normalizes a batch of raw items, builds
//! the vote matrix, estimates rule reliability, aggregates labels and
//! summarizes the rules. Nothing survives between batches.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::aggregate::{LabelAggregator, LabelRecord};
use crate::config::EngineConfig;
use crate::diagnostics::{self, DiagnosticsReport};
use crate::error::{BatchWarning, ConfigurationError, LabelResult};
use crate::item::{Item, RawItem};
use crate::matrix::VoteMatrix;
use crate::normalize::Normalizer;
use crate::reliability::{ReliabilityEstimator, ReliabilityProfile};
use crate::rule::RuleSet;

/// Unique identifier for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Creates a new random batch ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything one batch produced.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Batch identifier.
    pub batch_id: BatchId,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// When the batch finished.
    pub finished_at: DateTime<Utc>,
    /// Normalized items, in input order.
    pub items: Vec<Item>,
    /// Votes of every rule on every item.
    pub matrix: VoteMatrix,
    /// Estimated reliability per rule.
    pub profile: ReliabilityProfile,
    /// One label per item, in input order.
    pub records: Vec<LabelRecord>,
    /// Per-rule statistics.
    pub diagnostics: DiagnosticsReport,
    /// Non-fatal conditions met along the way.
    pub warnings: Vec<BatchWarning>,
}

impl BatchOutcome {
    /// Returns true if any warning was raised.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Records that came out as ABSTAIN.
    pub fn abstentions(&self) -> impl Iterator<Item = &LabelRecord> + '_ {
        self.records.iter().filter(|r| r.abstained)
    }
}

/// Runs the labeling pipeline over whole batches.
#[derive(Debug, Clone)]
pub struct LabelingEngine {
    rules: RuleSet,
    normalizer: Normalizer,
    estimator: ReliabilityEstimator,
    aggregator: LabelAggregator,
}

impl LabelingEngine {
    /// Creates an engine with default tuning.
    ///
    /// # Errors
    /// `EmptyRuleSet` if no rule is registered.
    pub fn new(rules: RuleSet) -> Result<Self, ConfigurationError> {
        rules.ensure_not_empty()?;
        Ok(Self {
            rules,
            normalizer: Normalizer::new(),
            estimator: ReliabilityEstimator::default(),
            aggregator: LabelAggregator::default(),
        })
    }

    /// Creates an engine with the given rules and the tuning from `config`.
    /// The rules section of `config` is ignored.
    pub fn with_config(rules: RuleSet, config: &EngineConfig) -> Result<Self, ConfigurationError> {
        rules.ensure_not_empty()?;
        Ok(Self {
            rules,
            normalizer: Normalizer::from_config(&config.normalizer),
            estimator: ReliabilityEstimator::new(config.estimator.clone())?,
            aggregator: LabelAggregator::new(config.aggregator.clone())?,
        })
    }

    /// Creates an engine entirely from configuration. Lexicon paths resolve
    /// against `base_dir`.
    pub fn from_config(config: &EngineConfig, base_dir: &Path) -> Result<Self, ConfigurationError> {
        let rules = config.rules.build(base_dir)?;
        Self::with_config(rules, config)
    }

    /// The registered rules.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The normalizer applied to raw text.
    #[must_use]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Normalizes raw items, keeping their order.
    #[must_use]
    pub fn normalize_items(&self, raw: Vec<RawItem>) -> Vec<Item> {
        raw.into_iter()
            .map(|item| Item::new(item, &self.normalizer))
            .collect()
    }

    /// Labels one batch of raw items.
    ///
    /// # Errors
    /// `EmptyItemSet` before any computation when `raw` is empty.
    pub fn run(&self, raw: Vec<RawItem>) -> LabelResult<BatchOutcome> {
        if raw.is_empty() {
            return Err(ConfigurationError::EmptyItemSet.into());
        }
        let items = self.normalize_items(raw);
        self.run_items(items)
    }

    /// Labels one batch of already normalized items.
    pub fn run_items(&self, items: Vec<Item>) -> LabelResult<BatchOutcome> {
        let batch_id = BatchId::new();
        let span = info_span!("batch", %batch_id);
        let _guard = span.enter();

        let started_at = Utc::now();
        info!(items = items.len(), rules = self.rules.len(), "batch started");

        let matrix = VoteMatrix::build(&items, &self.rules)?;
        let profile = self.estimator.estimate(&matrix);
        let records = self.aggregator.aggregate(&matrix, &profile)?;
        let diagnostics = diagnostics::summarize(&matrix);

        let mut warnings = Vec::new();
        if let Some(w) = fault_warning(&matrix) {
            warnings.push(w);
        }
        warnings.extend(profile.warnings());
        for w in &warnings {
            warn!(warning = %w, "batch warning");
        }

        let finished_at = Utc::now();
        info!(
            iterations = profile.iterations(),
            converged = profile.converged(),
            abstained = records.iter().filter(|r| r.abstained).count(),
            warnings = warnings.len(),
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "batch finished"
        );

        Ok(BatchOutcome {
            batch_id,
            started_at,
            finished_at,
            items,
            matrix,
            profile,
            records,
            diagnostics,
            warnings,
        })
    }
}

fn fault_warning(matrix: &VoteMatrix) -> Option<BatchWarning> {
    if matrix.faults().is_empty() {
        return None;
    }
    let mut faulted = vec![false; matrix.n_rules()];
    for f in matrix.faults() {
        faulted[f.rule_index] = true;
    }
    let rules = matrix
        .columns()
        .iter()
        .zip(faulted)
        .filter(|(_, hit)| *hit)
        .map(|(c, _)| c.name.clone())
        .collect();
    Some(BatchWarning::RuleFaults {
        count: matrix.faults().len(),
        rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Class, Polarity};
    use crate::error::LabelError;
    use crate::rule::{Rule, RuleFault};

    fn contains(word: &'static str, polarity: Polarity) -> Rule {
        Rule::new(word, polarity, move |text| {
            if text.split_whitespace().any(|t| t == word) {
                polarity.class()
            } else {
                Class::Abstain
            }
        })
    }

    fn engine() -> LabelingEngine {
        let rules = RuleSet::new()
            .with(contains("sobe", Polarity::Positive))
            .unwrap()
            .with(contains("alta", Polarity::Positive))
            .unwrap()
            .with(contains("cai", Polarity::Negative))
            .unwrap();
        LabelingEngine::new(rules).unwrap()
    }

    #[test]
    fn empty_rule_set_is_rejected() {
        assert!(matches!(
            LabelingEngine::new(RuleSet::new()),
            Err(ConfigurationError::EmptyRuleSet)
        ));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let err = engine().run(Vec::new()).unwrap_err();
        assert!(matches!(err, LabelError::Configuration(ConfigurationError::EmptyItemSet)));
    }

    #[test]
    fn labels_a_batch() {
        let outcome = engine()
            .run(vec![
                RawItem::new("a", "Petrobras SOBE 3% em alta!"),
                RawItem::new("b", "Vale cai após balanço"),
                RawItem::new("c", "Reunião do Copom amanhã"),
            ])
            .unwrap();

        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.records[0].predicted_class, Class::Positive);
        assert_eq!(outcome.records[1].predicted_class, Class::Negative);
        assert!(outcome.records[2].abstained);
        assert_eq!(outcome.abstentions().count(), 1);
        assert_eq!(outcome.items[0].normalized_text(), "petrobras sobe <NUM> em alta");
        assert!(outcome.finished_at >= outcome.started_at);
        assert!(!outcome.has_warnings());
    }

    #[test]
    fn faults_are_reported_as_warnings() {
        let rules = RuleSet::new()
            .with(contains("sobe", Polarity::Positive))
            .unwrap()
            .with(contains("cai", Polarity::Negative))
            .unwrap()
            .with(Rule::fallible("fragile", Polarity::Negative, |text| {
                if text.contains("erro") {
                    Err(RuleFault::new("boom"))
                } else {
                    Ok(Class::Abstain)
                }
            }))
            .unwrap();
        let outcome = LabelingEngine::new(rules)
            .unwrap()
            .run(vec![
                RawItem::new("a", "ação sobe"),
                RawItem::new("b", "erro cai"),
            ])
            .unwrap();

        assert_eq!(outcome.matrix.faults().len(), 1);
        assert!(outcome.warnings.contains(&BatchWarning::RuleFaults {
            count: 1,
            rules: vec!["fragile".to_string()],
        }));
        assert_eq!(outcome.diagnostics.get("fragile").unwrap().faults, 1);
        assert_eq!(outcome.records[1].predicted_class, Class::Negative);
    }

    #[test]
    fn batch_ids_are_unique() {
        let e = engine();
        let a = e.run(vec![RawItem::new("a", "sobe")]).unwrap();
        let b = e.run(vec![RawItem::new("a", "sobe")]).unwrap();
        assert_ne!(a.batch_id, b.batch_id);
        assert_eq!(a.matrix.fingerprint(), b.matrix.fingerprint());
        assert_eq!(a.profile.fingerprint(), b.profile.fingerprint());
    }
}
