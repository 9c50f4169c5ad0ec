//! Ownership transfer under concurrent claims.
//!
//! State machine over `is_claimed` plus `owner_id`:
//!
//! ```text
//!   unclaimed ──guarded claim──▶ claimed(owner)
//!       │                          │      ▲
//!       └────────force claim───────┴──────┘  (owner reassigned, version + 1)
//! ```
//!
//! Each claim is one conditional update in the store. A guarded claim that
//! affects zero rows is a [`ClaimOutcome::Rejected`] value, whether the row
//! never existed or a concurrent claim won. There is no retry.

use std::sync::Arc;

use crate::store::ContentStore;
use crate::types::{BulkClaimItem, BulkClaimReport, ClaimMode, ClaimOutcome, ContentId, UserId};

/// Error type for claim operations.
///
/// Conflicts are not errors; only datastore failures end up here.
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// Store error.
    #[error("Store error: {0}")]
    StoreError(String),
}

impl ClaimError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::StoreError(e.to_string())
    }
}

/// Coordinates claims against a content store.
pub struct ClaimCoordinator<S: ContentStore> {
    store: Arc<S>,
}

impl<S: ContentStore> ClaimCoordinator<S> {
    /// Create a coordinator over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Claim `content_id` for `new_owner`.
    ///
    /// Guarded claims succeed only while the row is unclaimed. `force`
    /// reassigns the owner whatever the claim state. Both bump `version`
    /// and return the updated row.
    pub async fn claim_content(
        &self,
        content_id: &ContentId,
        new_owner: &UserId,
        force: bool,
    ) -> Result<ClaimOutcome, ClaimError> {
        let mode = ClaimMode::from_force(force);
        let updated = self
            .store
            .claim(content_id, new_owner, mode)
            .await
            .map_err(ClaimError::from_store)?;

        match updated {
            Some(content) => {
                tracing::info!(
                    content_id = %content_id,
                    owner_id = %new_owner,
                    version = content.version,
                    force,
                    "content claimed"
                );
                Ok(ClaimOutcome::Claimed {
                    content: Box::new(content),
                })
            }
            None => {
                tracing::warn!(
                    content_id = %content_id,
                    owner_id = %new_owner,
                    force,
                    "claim affected no rows"
                );
                Ok(ClaimOutcome::conflict(*content_id))
            }
        }
    }

    /// Claim each id in turn for `new_owner`.
    ///
    /// Ids are processed one at a time, in order. A failure on one id,
    /// conflict or store error, is recorded and the batch continues.
    pub async fn bulk_claim_content(
        &self,
        content_ids: &[ContentId],
        new_owner: &UserId,
    ) -> BulkClaimReport {
        let mut results = Vec::with_capacity(content_ids.len());

        for content_id in content_ids {
            let item = match self.claim_content(content_id, new_owner, false).await {
                Ok(ClaimOutcome::Claimed { .. }) => BulkClaimItem {
                    content_id: *content_id,
                    success: true,
                    error: None,
                },
                Ok(ClaimOutcome::Rejected { reason, .. }) => BulkClaimItem {
                    content_id: *content_id,
                    success: false,
                    error: Some(reason),
                },
                Err(e) => {
                    tracing::error!(content_id = %content_id, error = %e, "bulk claim item failed");
                    BulkClaimItem {
                        content_id: *content_id,
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(item);
        }

        let report = BulkClaimReport { results };
        tracing::info!(
            owner_id = %new_owner,
            requested = content_ids.len(),
            claimed = report.successful().len(),
            "bulk claim complete"
        );
        report
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryContentStore;
    use crate::types::{Content, ContentType, Visibility, CLAIM_CONFLICT_REASON};

    fn unclaimed(author: &str) -> Content {
        Content::unclaimed(author, "Serverless patterns", ContentType::Blog, Visibility::Public)
    }

    async fn coordinator_with(items: Vec<Content>) -> ClaimCoordinator<InMemoryContentStore> {
        let store = InMemoryContentStore::new();
        for item in items {
            store.insert(item).await.unwrap();
        }
        ClaimCoordinator::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_guarded_claim_transfers_ownership() {
        let content = unclaimed("Jane Doe");
        let id = content.id;
        let coordinator = coordinator_with(vec![content]).await;
        let owner = UserId::random();

        let outcome = coordinator.claim_content(&id, &owner, false).await.unwrap();
        let claimed = outcome.content().unwrap();

        assert_eq!(claimed.owner_id, Some(owner));
        assert!(claimed.is_claimed);
        assert!(claimed.claimed_at.is_some());
        assert_eq!(claimed.version, 2);
    }

    #[tokio::test]
    async fn test_second_guarded_claim_is_rejected() {
        let content = unclaimed("Jane Doe");
        let id = content.id;
        let coordinator = coordinator_with(vec![content]).await;

        let first = coordinator.claim_content(&id, &UserId::random(), false).await.unwrap();
        assert!(first.is_claimed());

        let second = coordinator.claim_content(&id, &UserId::random(), false).await.unwrap();
        assert_eq!(second, ClaimOutcome::conflict(id));
        assert_eq!(coordinator.store().get_raw(&id).unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_unknown_id_is_rejected_not_an_error() {
        let coordinator = coordinator_with(vec![]).await;
        let id = ContentId::random();

        let outcome = coordinator.claim_content(&id, &UserId::random(), false).await.unwrap();
        match outcome {
            ClaimOutcome::Rejected { content_id, reason } => {
                assert_eq!(content_id, id);
                assert_eq!(reason, CLAIM_CONFLICT_REASON);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_force_claim_reassigns_claimed_content() {
        let original = UserId::random();
        let content = Content::new(original, "Owned", ContentType::Podcast, Visibility::Private);
        let id = content.id;
        let coordinator = coordinator_with(vec![content]).await;
        let admin_target = UserId::random();

        let rejected = coordinator.claim_content(&id, &admin_target, false).await.unwrap();
        assert!(!rejected.is_claimed());

        let forced = coordinator.claim_content(&id, &admin_target, true).await.unwrap();
        let row = forced.content().unwrap();
        assert_eq!(row.owner_id, Some(admin_target));
        assert!(row.is_claimed);
        assert_eq!(row.version, 2);
    }

    #[tokio::test]
    async fn test_force_claim_skips_deleted_content() {
        let content = unclaimed("Jane Doe");
        let id = content.id;
        let coordinator = coordinator_with(vec![content]).await;
        coordinator.store().soft_delete(&id).await.unwrap();

        let outcome = coordinator.claim_content(&id, &UserId::random(), true).await.unwrap();
        assert!(!outcome.is_claimed());
    }

    #[tokio::test]
    async fn test_bulk_claim_isolates_failures() {
        let free = unclaimed("Jane Doe");
        let taken = Content::new(UserId::random(), "Taken", ContentType::Blog, Visibility::Public);
        let (free_id, taken_id) = (free.id, taken.id);
        let coordinator = coordinator_with(vec![free, taken]).await;
        let owner = UserId::random();

        let report = coordinator.bulk_claim_content(&[free_id, taken_id], &owner).await;

        assert_eq!(report.successful(), vec![free_id]);
        assert_eq!(
            report.failed(),
            vec![(taken_id, CLAIM_CONFLICT_REASON.to_string())]
        );
        assert_eq!(report.results[0].content_id, free_id);
        assert_eq!(report.results[1].content_id, taken_id);
    }

    #[tokio::test]
    async fn test_bulk_claim_repeated_id_claims_once() {
        let free = unclaimed("Jane Doe");
        let id = free.id;
        let coordinator = coordinator_with(vec![free]).await;

        let report = coordinator.bulk_claim_content(&[id, id], &UserId::random()).await;
        assert_eq!(report.successful(), vec![id]);
        assert_eq!(report.failed().len(), 1);
    }
}
