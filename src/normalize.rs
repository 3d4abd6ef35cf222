//! Text normalization applied before any rule sees an item.
//!
//! Steps, in order:
//! 0. drop URL tokens, then apply configured literal replacements (empty by default)
//! 1. drop hashtag/mention tokens
//! 2. lower-case
//! 3. numeric tokens become [`NUM_TOKEN`]
//! 4. strip punctuation, symbols and emoji; collapse whitespace
//!
//! Normalization is pure and never fails; the empty string maps to itself.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder substituted for numeric tokens.
pub const NUM_TOKEN: &str = "<NUM>";

static URL_RE: OnceLock<Regex> = OnceLock::new();
static MARKUP_RE: OnceLock<Regex> = OnceLock::new();
static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
static STRIP_RE: OnceLock<Regex> = OnceLock::new();

fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|\s)(?:[a-z][a-z0-9+.\-]*://|www\.)\S*").expect("url regex is valid")
    })
}

fn markup_re() -> &'static Regex {
    MARKUP_RE.get_or_init(|| Regex::new(r"^[#@]\w").expect("markup regex is valid"))
}

fn number_re() -> &'static Regex {
    NUMBER_RE.get_or_init(|| Regex::new(r"^\d+(?:[.,]\d+)*$").expect("number regex is valid"))
}

// Punctuation and symbol categories cover ASCII punctuation, typographic quotes,
// bullets, currency and the pictographic emoji blocks. ZWJ, variation selectors,
// the keycap combiner and skin-tone modifiers are not symbols and are listed.
fn strip_re() -> &'static Regex {
    STRIP_RE.get_or_init(|| {
        Regex::new(r"[\p{P}\p{S}\x{200D}\x{FE0E}\x{FE0F}\x{20E3}\x{1F3FB}-\x{1F3FF}]+")
            .expect("strip regex is valid")
    })
}

/// Named replacement tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerPreset {
    /// Brazilian financial headlines and tweets.
    PtBrFinancial,
}

impl NormalizerPreset {
    /// The literal replacements, applied in order.
    #[must_use]
    pub fn replacements(self) -> Vec<(String, String)> {
        let table: &[(&str, &str)] = match self {
            Self::PtBrFinancial => &[
                ("-feira", ""),
                ("-alvo", " alvo"),
                ("\n", " "),
                ("+", ""),
                ("º", ""),
                ("‘", ""),
                ("’", ""),
                ("•", ""),
                ("-", ""),
                ("%", " por cento"),
                ("US$", ""),
                ("R$", ""),
                ("U$", ""),
                ("S&P 500", "spx"),
                // The word after a slash becomes a mention and is dropped.
                ("/", " @"),
            ],
        };
        table
            .iter()
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect()
    }
}

/// Normalizer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Replacement table applied before `replacements`.
    pub preset: Option<NormalizerPreset>,

    /// Literal `[from, to]` replacements applied before step 1.
    pub replacements: Vec<(String, String)>,
}

/// Deterministic text normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalizer {
    replacements: Vec<(String, String)>,
}

impl Normalizer {
    /// A normalizer with no literal replacements.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalizer from configuration.
    #[must_use]
    pub fn from_config(config: &NormalizerConfig) -> Self {
        let mut replacements = config
            .preset
            .map(NormalizerPreset::replacements)
            .unwrap_or_default();
        replacements.extend(
            config
                .replacements
                .iter()
                .filter(|(from, _)| !from.is_empty())
                .cloned(),
        );
        Self { replacements }
    }

    /// Adds a literal replacement applied before the fixed steps.
    #[must_use]
    pub fn with_replacement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        if !from.is_empty() {
            self.replacements.push((from, to.into()));
        }
        self
    }

    /// Normalizes `text`.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        // URLs go first so replacements such as `/` cannot split them.
        let mut replaced = url_re().replace_all(text, " ");
        for (from, to) in &self.replacements {
            if replaced.contains(from.as_str()) {
                replaced = Cow::Owned(replaced.replace(from.as_str(), to));
            }
        }

        let mut out = String::with_capacity(replaced.len());
        for token in replaced.split_whitespace() {
            if markup_re().is_match(token) {
                continue;
            }

            let lower = token.to_lowercase();
            let cleaned = if is_numeric(&lower) {
                Cow::Borrowed(NUM_TOKEN)
            } else {
                strip_re().replace_all(&lower, "")
            };

            for piece in cleaned.split_whitespace() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(piece);
            }
        }
        out
    }
}

/// Normalizes `text` with the default normalizer.
#[must_use]
pub fn normalize(text: &str) -> String {
    Normalizer::default().normalize(text)
}

fn is_numeric(token: &str) -> bool {
    let core = token.trim_matches(|c: char| !c.is_alphanumeric());
    !core.is_empty() && number_re().is_match(core)
}
