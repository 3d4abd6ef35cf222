//! TOML configuration.
//!
//! Every section is optional; missing keys take their defaults.
//!
//! ```toml
//! [normalizer]
//! preset = "pt_br_financial"
//!
//! [estimator]
//! max_iterations = 100
//! tolerance = 1e-4
//!
//! [aggregator]
//! margin = 0.0
//!
//! [rules]
//! presets = ["regex_dividends", "regex_positive_results", "regex_negative_results"]
//!
//! [[rules.lexicon_rules]]
//! name = "good_adjectives"
//! polarity = "positive"
//! path = "dicts/pos_adj.txt"
//!
//! [[rules.pattern_rules]]
//! name = "guidance_cut"
//! polarity = "negative"
//! pattern = "corta.*projec"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::AggregatorConfig;
use crate::class::Polarity;
use crate::error::ConfigurationError;
use crate::normalize::NormalizerConfig;
use crate::reliability::EstimatorConfig;
use crate::rule::{presets, Lexicon, Rule, RuleSet};

/// A keyword rule backed by a lexicon file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconRuleConfig {
    /// Unique rule name.
    pub name: String,
    /// Class the rule votes when a word matches.
    pub polarity: Polarity,
    /// Lexicon file; relative paths resolve against the config directory.
    pub path: PathBuf,
}

/// A regex rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRuleConfig {
    /// Unique rule name.
    pub name: String,
    /// Class the rule votes when the pattern matches.
    pub polarity: Polarity,
    /// Case-insensitive regex, matched anywhere in the normalized text.
    pub pattern: String,
}

/// Rules to register at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Built-in rules by name (see [`presets::PRESET_NAMES`]).
    pub presets: Vec<String>,
    /// Keyword rules.
    pub lexicon_rules: Vec<LexiconRuleConfig>,
    /// Regex rules.
    pub pattern_rules: Vec<PatternRuleConfig>,
}

impl RulesConfig {
    /// Returns true if no rule is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty() && self.lexicon_rules.is_empty() && self.pattern_rules.is_empty()
    }

    /// Registers the configured rules: lexicon rules, then pattern rules,
    /// then presets.
    ///
    /// Each lexicon file is read once, even when several rules share it.
    pub fn build(&self, base_dir: &Path) -> Result<RuleSet, ConfigurationError> {
        let mut set = RuleSet::new();
        let mut lexicons: HashMap<PathBuf, Arc<Lexicon>> = HashMap::new();

        for cfg in &self.lexicon_rules {
            let path = if cfg.path.is_absolute() {
                cfg.path.clone()
            } else {
                base_dir.join(&cfg.path)
            };
            let lexicon = match lexicons.get(&path) {
                Some(lexicon) => Arc::clone(lexicon),
                None => {
                    let lexicon = Arc::new(Lexicon::load(&path)?);
                    debug!(path = %path.display(), words = lexicon.len(), "lexicon loaded");
                    lexicons.insert(path, Arc::clone(&lexicon));
                    lexicon
                }
            };
            set.register(Rule::keywords(cfg.name.clone(), cfg.polarity, lexicon))?;
        }

        for cfg in &self.pattern_rules {
            set.register(Rule::pattern(cfg.name.clone(), cfg.polarity, &cfg.pattern)?)?;
        }

        for name in &self.presets {
            set.register(presets::by_name(name)?)?;
        }

        Ok(set)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Text normalization.
    pub normalizer: NormalizerConfig,
    /// Reliability estimation.
    pub estimator: EstimatorConfig,
    /// Label assignment.
    pub aggregator: AggregatorConfig,
    /// Rules to register.
    pub rules: RulesConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigurationError::ConfigFile {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigurationError::ConfigFile {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates estimator and aggregator parameters.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.estimator.validate()?;
        self.aggregator.validate()?;
        Ok(())
    }
}
