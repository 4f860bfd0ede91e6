//! Domain types for source and target string records.
//!
//! A [`SourceRecord`] never carries an authored hash: its fingerprint is
//! recomputed from `text` + `description` every time one is constructed.
//! A [`TargetRecord`] stores the fingerprint of the source content that
//! produced its translation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hash::content_hash;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Fixed-width lowercase hex fingerprint of a source `(text, description)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Format tags
// ---------------------------------------------------------------------------

/// The on-disk representation of a record collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    /// Comma-separated values with a header row.
    Csv,
    /// `key=value` lines with `#` comments carrying metadata.
    Properties,
    /// `export default { "key": "value" }` module.
    Js,
}

impl FormatTag {
    pub fn all() -> &'static [FormatTag] {
        &[FormatTag::Csv, FormatTag::Properties, FormatTag::Js]
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatTag::Csv => write!(f, "csv"),
            FormatTag::Properties => write!(f, "properties"),
            FormatTag::Js => write!(f, "js"),
        }
    }
}

impl FromStr for FormatTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "properties" | "props" => Ok(Self::Properties),
            "js" | "javascript" | "module" => Ok(Self::Js),
            other => Err(format!(
                "unknown format '{other}'; expected: csv, properties, js"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One localizable string in the source-language file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub key: String,
    pub text: String,
    /// Translator context; may be empty.
    pub description: String,
    hash: ContentHash,
}

impl SourceRecord {
    /// Build a record, deriving its hash from `text` and `description`.
    pub fn new(
        key: impl Into<String>,
        text: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let description = description.into();
        let hash = content_hash(&text, &description);
        Self {
            key: key.into(),
            text,
            description,
            hash,
        }
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }
}

/// One translated string in a target-language file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub key: String,
    /// The translation.
    pub text: String,
    /// Fingerprint of the source content this translation was produced from.
    pub hash: ContentHash,
}

impl TargetRecord {
    pub fn new(key: impl Into<String>, text: impl Into<String>, hash: ContentHash) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            hash,
        }
    }

    /// `true` when this translation certifies the current source content.
    pub fn is_current_for(&self, source: &SourceRecord) -> bool {
        self.hash == source.hash
    }
}

/// A key that needs a fresh translation this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: String,
    pub source: SourceRecord,
}

impl Candidate {
    pub fn request(&self) -> BatchRequest {
        BatchRequest {
            key: self.key.clone(),
            text: self.source.text.clone(),
            description: self.source.description.clone(),
        }
    }
}

/// Minimal per-item payload sent to a batch translation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub key: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Authoritative key set for a run, ordered by key.
pub type SourceMap = BTreeMap<String, SourceRecord>;

/// Index source records by key. On duplicate keys the last occurrence wins;
/// the overwritten keys are returned so callers can report them.
pub fn build_source_map(records: Vec<SourceRecord>) -> (SourceMap, Vec<String>) {
    let mut map = SourceMap::new();
    let mut duplicates = Vec::new();
    for record in records {
        if let Some(previous) = map.insert(record.key.clone(), record) {
            duplicates.push(previous.key);
        }
    }
    (map, duplicates)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
