//! Regex rules for Brazilian financial headlines.
//!
//! Patterns run on normalized (lower-cased, punctuation-free) text.

use crate::class::Polarity;
use crate::error::ConfigurationError;
use crate::rule::Rule;

const DIVIDENDS: &str = r"pag.*dividendo|anunc.*dividendo|distrib.*dividendo";

const POSITIVE_RESULTS: &str =
    r"fech.*alta|abr.*alta|fech.*pos|abr.*pos|estre.*alta|prev.*alta|result.*positivo";

const NEGATIVE_RESULTS: &str = r"fech.*queda|abr.*queda|fech.*neg|abr.*neg|prev.*baixa|prev.*queda|em.*queda|result.*negativo";

/// Names accepted by [`by_name`].
pub const PRESET_NAMES: [&str; 3] = [
    "regex_dividends",
    "regex_positive_results",
    "regex_negative_results",
];

/// Payment, announcement or distribution of dividends.
pub fn dividends() -> Result<Rule, ConfigurationError> {
    Rule::pattern("regex_dividends", Polarity::Positive, DIVIDENDS)
}

/// Market closing/opening up, forecast of a rise, positive result.
pub fn positive_results() -> Result<Rule, ConfigurationError> {
    Rule::pattern("regex_positive_results", Polarity::Positive, POSITIVE_RESULTS)
}

/// Market closing/opening down, forecast of a fall, negative result.
pub fn negative_results() -> Result<Rule, ConfigurationError> {
    Rule::pattern("regex_negative_results", Polarity::Negative, NEGATIVE_RESULTS)
}

/// Looks a preset up by name.
pub fn by_name(name: &str) -> Result<Rule, ConfigurationError> {
    match name {
        "regex_dividends" => dividends(),
        "regex_positive_results" => positive_results(),
        "regex_negative_results" => negative_results(),
        _ => Err(ConfigurationError::UnknownPreset {
            name: name.to_string(),
        }),
    }
}
