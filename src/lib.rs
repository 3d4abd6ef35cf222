//! # labelfuse - Weak-supervision label aggregation for financial sentiment
//!
//! Many independent heuristic rules vote POSITIVE, NEGATIVE or ABSTAIN on
//! each news headline or tweet. labelfuse estimates how reliable every rule
//! is from their agreement alone, with no ground truth, and collapses the
//! votes into one label per item. When the evidence is balanced it abstains
//! rather than guess.
//!
//! ## Pipeline
//!
//! - **Normalizer**: URL/markup stripping, lower-casing, `<NUM>` placeholders
//! - **Rules**: named closures `normalized_text -> Class` with a polarity
//! - **Vote matrix**: every rule applied to every item, faults become ABSTAIN
//! - **Reliability estimator**: EM-style fixed point over rule weights
//! - **Label aggregator**: weighted posterior plus an abstaining tie-break
//! - **Diagnostics**: coverage, overlap and pairwise agreement per rule
//!
//! ## Usage
//!
//! ```rust,ignore
//! use labelfuse::{Class, LabelingEngine, Polarity, RawItem, Rule, RuleSet};
//!
//! let rules = RuleSet::new()
//!     .with(Rule::pattern("closing_up", Polarity::Positive, "fech.*alta")?)?
//!     .with(Rule::pattern("closing_down", Polarity::Negative, "fech.*queda")?)?;
//!
//! let engine = LabelingEngine::new(rules)?;
//! let outcome = engine.run(vec![
//!     RawItem::new("1", "Ibovespa fecha em alta de 2%"),
//!     RawItem::new("2", "Dólar fecha em queda"),
//! ])?;
//!
//! assert_eq!(outcome.records[0].predicted_class, Class::Positive);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod class;
pub mod error;
pub mod item;
pub mod normalize;
pub mod rule;

// Aggregation
pub mod aggregate;
pub mod diagnostics;
pub mod matrix;
pub mod posterior;
pub mod reliability;

// Batch runs
pub mod config;
pub mod engine;

pub use aggregate::{AggregatorConfig, LabelAggregator, LabelRecord};
pub use class::{Class, Polarity};
pub use config::{EngineConfig, LexiconRuleConfig, PatternRuleConfig, RulesConfig};
pub use diagnostics::{summarize, DiagnosticsReport, RuleStats};
pub use engine::{BatchId, BatchOutcome, LabelingEngine};
pub use error::{BatchWarning, ConfigurationError, LabelError, LabelResult, ValidationError};
pub use item::{Item, ItemId, RawItem};
pub use matrix::{RuleColumn, RuleFaultRecord, VoteMatrix};
pub use normalize::{normalize, Normalizer, NormalizerConfig, NormalizerPreset, NUM_TOKEN};
pub use posterior::Posterior;
pub use reliability::{
    DegenerateClass, EstimatorConfig, ReliabilityEstimator, ReliabilityProfile, RuleReliability,
    RuleStatus,
};
pub use rule::{Lexicon, Rule, RuleFault, RuleSet};
