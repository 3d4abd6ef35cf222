//! Word lists shared by keyword rules.
//!
//! Lexicons are loaded once at registration time and shared by `Arc`; rules
//! never touch storage while a batch runs.

use std::collections::HashSet;
use std::fs;
use std::io::BufRead;
use std::path::Path;

use crate::error::ConfigurationError;

/// A set of lower-cased words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    name: String,
    words: HashSet<String>,
}

impl Lexicon {
    /// Builds a lexicon from words. Entries are trimmed and lower-cased; blank
    /// entries are skipped.
    pub fn from_words<I, S>(name: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .filter_map(|w| {
                let w = w.as_ref().trim();
                (!w.is_empty()).then(|| w.to_lowercase())
            })
            .collect();
        Self {
            name: name.into(),
            words,
        }
    }

    /// Reads one entry per line. Lines starting with `#` are comments.
    pub fn from_reader(
        name: impl Into<String>,
        reader: impl BufRead,
    ) -> Result<Self, std::io::Error> {
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim_start().starts_with('#') {
                continue;
            }
            lines.push(line);
        }
        Ok(Self::from_words(name, lines))
    }

    /// Loads a lexicon file. The lexicon is named after the file stem.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let to_err = |e: std::io::Error| ConfigurationError::Lexicon {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let file = fs::File::open(path).map_err(to_err)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_reader(name, std::io::BufReader::new(file)).map_err(to_err)
    }

    /// Lexicon name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `word` is in the lexicon. Expects lower-cased input.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true if the lexicon has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
