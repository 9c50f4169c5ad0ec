//! Duplicate-candidate types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::content::ContentId;

/// Field compared during duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateField {
    /// Title, compared by 3-character shingle Jaccard.
    Title,
    /// Tag set Jaccard.
    Tags,
    /// Exact shared URL.
    Urls,
}

impl DuplicateField {
    /// Parse a field name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Some(Self::Title),
            "tags" => Some(Self::Tags),
            "urls" => Some(Self::Urls),
            _ => None,
        }
    }
}

impl fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Tags => write!(f, "tags"),
            Self::Urls => write!(f, "urls"),
        }
    }
}

/// A pair of items that look like duplicates. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    /// First item.
    pub content_a: ContentId,
    /// Second item.
    pub content_b: ContentId,
    /// Requested fields whose score met the threshold.
    pub matched_fields: BTreeSet<DuplicateField>,
    /// Highest score among matched fields, in [0, 1].
    pub similarity: f64,
}

impl DuplicateCandidate {
    /// Whether this pair involves `id`.
    pub fn involves(&self, id: &ContentId) -> bool {
        &self.content_a == id || &self.content_b == id
    }
}
