//! Trending order over visible content.
//!
//! Engagement is owned by another system; this module only reads scores
//! through [`EngagementSource`] and orders the viewer's visible rows by them.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::store::ContentStore;
use crate::types::{Content, ContentId, QueryOptions, Viewer};

/// Error type for ranking operations.
#[derive(Debug, thiserror::Error)]
pub enum RankerError {
    /// Store error.
    #[error("Store error: {0}")]
    StoreError(String),
    /// Engagement source error.
    #[error("Engagement error: {0}")]
    EngagementError(String),
}

/// Per-content engagement metric maintained elsewhere.
#[async_trait]
pub trait EngagementSource: Send + Sync {
    /// Error type for score lookups.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Scores for `ids`. Ids without a score may be omitted.
    async fn engagement_scores(
        &self,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, f64>, Self::Error>;
}

/// Fixed in-process scores.
#[derive(Debug, Default)]
pub struct StaticEngagement {
    scores: RwLock<HashMap<ContentId, f64>>,
}

impl StaticEngagement {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the score for one item.
    pub fn set(&self, id: ContentId, score: f64) {
        self.scores.write().insert(id, score);
    }
}

impl FromIterator<(ContentId, f64)> for StaticEngagement {
    fn from_iter<I: IntoIterator<Item = (ContentId, f64)>>(iter: I) -> Self {
        Self {
            scores: RwLock::new(iter.into_iter().collect()),
        }
    }
}

#[async_trait]
impl EngagementSource for StaticEngagement {
    type Error = Infallible;

    async fn engagement_scores(
        &self,
        ids: &[ContentId],
    ) -> Result<HashMap<ContentId, f64>, Self::Error> {
        let scores = self.scores.read();
        Ok(ids
            .iter()
            .filter_map(|id| scores.get(id).map(|s| (*id, *s)))
            .collect())
    }
}

/// Score desc, then publish date desc (nulls last), then id asc.
fn trending_order(a: &(f64, &Content), b: &(f64, &Content)) -> Ordering {
    let (score_a, content_a) = a;
    let (score_b, content_b) = b;

    score_b
        .total_cmp(score_a)
        .then_with(|| match (content_a.publish_date, content_b.publish_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| content_a.id.cmp(&content_b.id))
}

/// Ranks visible content by engagement.
pub struct SearchRanker<S: ContentStore, E: EngagementSource> {
    store: Arc<S>,
    engagement: Arc<E>,
}

impl<S: ContentStore, E: EngagementSource> SearchRanker<S, E> {
    /// Create a ranker.
    pub fn new(store: Arc<S>, engagement: Arc<E>) -> Self {
        Self { store, engagement }
    }

    /// Content visible to `viewer`, most engaged first.
    ///
    /// Missing scores count as 0. The order is total, so equal inputs
    /// always give the same page.
    pub async fn find_trending_content(
        &self,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, RankerError> {
        let visible = self
            .store
            .find_visible(viewer)
            .await
            .map_err(|e| RankerError::StoreError(e.to_string()))?;

        let ids: Vec<ContentId> = visible.iter().map(|c| c.id).collect();
        let scores = self
            .engagement
            .engagement_scores(&ids)
            .await
            .map_err(|e| RankerError::EngagementError(e.to_string()))?;

        let mut ranked: Vec<(f64, &Content)> = visible
            .iter()
            .map(|c| (scores.get(&c.id).copied().unwrap_or(0.0), c))
            .collect();
        ranked.sort_by(trending_order);

        tracing::debug!(
            candidates = ranked.len(),
            scored = scores.len(),
            offset = options.offset,
            limit = ?options.limit,
            "trending order computed"
        );

        Ok(options.paginate(ranked.into_iter().map(|(_, c)| c.clone()).collect()))
    }
}
