//! Items to be labeled.
//!
//! A [`RawItem`] is what the content-acquisition side hands over. It becomes an
//! immutable [`Item`] once normalized. Duplicate ids are allowed and treated as
//! independent items.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::Normalizer;

/// Opaque item identifier supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates an item id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Input record from the content-acquisition collaborator.
///
/// Tweets carry their text in `text`, scraped headlines in `title`; both
/// deserialize into the same field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// Caller-supplied identifier.
    pub id: ItemId,

    /// Unprocessed text.
    #[serde(alias = "title")]
    pub text: String,

    /// Where the text came from (e.g. `twitter`, a news site).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Free-form metadata passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl RawItem {
    /// Creates a raw item without source or metadata.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: None,
            metadata: None,
        }
    }

    /// Sets the source tag.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A normalized, immutable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    text: String,
    normalized_text: String,
}

impl Item {
    /// Normalizes a raw item.
    #[must_use]
    pub fn new(raw: RawItem, normalizer: &Normalizer) -> Self {
        let normalized_text = normalizer.normalize(&raw.text);
        Self {
            id: raw.id,
            text: raw.text,
            normalized_text,
        }
    }

    /// Builds an item whose text is already normalized.
    #[must_use]
    pub fn prenormalized(id: impl Into<ItemId>, normalized_text: impl Into<String>) -> Self {
        let normalized_text = normalized_text.into();
        Self {
            id: id.into(),
            text: normalized_text.clone(),
            normalized_text,
        }
    }

    /// The item id.
    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// The original text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text rules see.
    #[must_use]
    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }
}
