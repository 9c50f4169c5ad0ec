//! Per-owner near-duplicate detection.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::ContentStore;
use crate::types::{
    Content, ContentId, DuplicateCandidate, DuplicateField, QueryOptions, UserId, Viewer,
};
use super::shingle::{jaccard, shingles, url_overlap};

/// Message carried by [`DedupError::NotFound`].
pub const CONTENT_NOT_FOUND: &str = "Content not found";

/// Default similarity threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Error type for duplicate detection.
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    /// Target content is not in the owner's candidate set.
    #[error("{0}")]
    NotFound(String),
    /// Store error.
    #[error("Store error: {0}")]
    StoreError(String),
}

impl DedupError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::StoreError(e.to_string())
    }
}

/// Parameters for [`SimilarityMatcher::find_duplicates`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateQuery {
    /// Owner whose library is scanned.
    pub owner_id: UserId,
    /// Minimum per-field score for a match, clamped to [0, 1].
    pub threshold: f64,
    /// Fields to compare.
    pub fields: BTreeSet<DuplicateField>,
    /// Only compare pairs involving this item.
    pub target: Option<ContentId>,
}

impl DuplicateQuery {
    /// Scan `owner_id`'s library with threshold 0.8 over title and tags.
    pub fn new(owner_id: UserId) -> Self {
        Self {
            owner_id,
            threshold: DEFAULT_THRESHOLD,
            fields: [DuplicateField::Title, DuplicateField::Tags].into_iter().collect(),
            target: None,
        }
    }

    /// Set the threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Replace the compared fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = DuplicateField>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    /// Restrict to pairs involving `target`.
    pub fn with_target(mut self, target: ContentId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Comparable features of one item, computed once per scan.
struct Features<'a> {
    content: &'a Content,
    title_shingles: BTreeSet<String>,
}

impl<'a> Features<'a> {
    fn new(content: &'a Content, fields: &BTreeSet<DuplicateField>) -> Self {
        let title_shingles = if fields.contains(&DuplicateField::Title) {
            shingles(&content.title)
        } else {
            BTreeSet::new()
        };
        Self {
            content,
            title_shingles,
        }
    }

    fn score(&self, other: &Features<'_>, field: DuplicateField) -> f64 {
        match field {
            DuplicateField::Title => jaccard(&self.title_shingles, &other.title_shingles),
            DuplicateField::Tags => jaccard(&self.content.tags, &other.content.tags),
            DuplicateField::Urls => url_overlap(&self.content.urls, &other.content.urls),
        }
    }
}

/// Compare one pair; `Some` iff at least one field meets the threshold.
fn compare(a: &Features<'_>, b: &Features<'_>, query: &DuplicateQuery) -> Option<DuplicateCandidate> {
    let mut matched_fields = BTreeSet::new();
    let mut similarity: f64 = 0.0;

    for &field in &query.fields {
        let score = a.score(b, field);
        if score >= query.threshold {
            matched_fields.insert(field);
            similarity = similarity.max(score);
        }
    }

    if matched_fields.is_empty() {
        return None;
    }
    Some(DuplicateCandidate {
        content_a: a.content.id,
        content_b: b.content.id,
        matched_fields,
        similarity,
    })
}

/// Near-duplicate detector over one owner's content.
///
/// Pairwise and O(n²) in the size of the owner's library.
pub struct SimilarityMatcher<S: ContentStore> {
    store: Arc<S>,
}

impl<S: ContentStore> SimilarityMatcher<S> {
    /// Create a matcher over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Find duplicate candidates in the owner's non-deleted content.
    ///
    /// Returns an empty list when the owner has at most one item. Fails with
    /// [`DedupError::NotFound`] when `target` is not among the owner's items.
    /// Pairs are emitted in a stable order but callers should not rely on it.
    pub async fn find_duplicates(
        &self,
        query: &DuplicateQuery,
    ) -> Result<Vec<DuplicateCandidate>, DedupError> {
        // The owner sees all of their own content, so this is exactly the
        // owner's non-deleted library.
        let candidates = self
            .store
            .find_by_user_id(&query.owner_id, &Viewer::user(query.owner_id), &QueryOptions::all())
            .await
            .map_err(DedupError::from_store)?;

        if candidates.len() <= 1 {
            return Ok(Vec::new());
        }

        let features: Vec<Features<'_>> = candidates
            .iter()
            .map(|c| Features::new(c, &query.fields))
            .collect();

        let mut pairs = 0usize;
        let mut duplicates = Vec::new();

        match query.target {
            Some(target) => {
                let anchor = features
                    .iter()
                    .find(|f| f.content.id == target)
                    .ok_or_else(|| DedupError::NotFound(CONTENT_NOT_FOUND.to_string()))?;

                for other in features.iter().filter(|f| f.content.id != target) {
                    pairs += 1;
                    duplicates.extend(compare(anchor, other, query));
                }
            }
            None => {
                for (i, a) in features.iter().enumerate() {
                    for b in &features[i + 1..] {
                        pairs += 1;
                        duplicates.extend(compare(a, b, query));
                    }
                }
            }
        }

        tracing::debug!(
            owner_id = %query.owner_id,
            candidates = candidates.len(),
            pairs,
            matches = duplicates.len(),
            threshold = query.threshold,
            "duplicate scan complete"
        );

        Ok(duplicates)
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
