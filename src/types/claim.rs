//! Claim outcomes.

use serde::{Deserialize, Serialize};

use super::content::{Content, ContentId};

/// Reason reported when a non-force claim affects zero rows.
///
/// Covers both "never existed" and "another claim won the race".
pub const CLAIM_CONFLICT_REASON: &str = "Content not found or already claimed";

/// How a claim treats the current claim state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMode {
    /// Only succeeds while `is_claimed == false`.
    Guarded,
    /// Admin override: reassigns the owner whatever the claim state.
    Force,
}

impl ClaimMode {
    /// Mode for a `force` flag.
    pub fn from_force(force: bool) -> Self {
        if force {
            Self::Force
        } else {
            Self::Guarded
        }
    }

    /// Whether this is the admin override.
    pub fn is_force(&self) -> bool {
        matches!(self, Self::Force)
    }
}

/// Result of a single claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// Ownership transferred; carries the updated row.
    Claimed {
        /// Row after the update, with its new version.
        content: Box<Content>,
    },
    /// Zero rows affected.
    Rejected {
        /// Content that was targeted.
        content_id: ContentId,
        /// Human-readable reason.
        reason: String,
    },
}

impl ClaimOutcome {
    /// Zero-rows outcome for `content_id`.
    pub fn conflict(content_id: ContentId) -> Self {
        Self::Rejected {
            content_id,
            reason: CLAIM_CONFLICT_REASON.to_string(),
        }
    }

    /// Whether the claim succeeded.
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed { .. })
    }

    /// The updated row, if the claim succeeded.
    pub fn content(&self) -> Option<&Content> {
        match self {
            Self::Claimed { content } => Some(content),
            Self::Rejected { .. } => None,
        }
    }
}

/// Per-id entry of a bulk claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkClaimItem {
    /// Targeted content.
    pub content_id: ContentId,
    /// Whether this id was claimed.
    pub success: bool,
    /// Failure reason when `success` is false.
    pub error: Option<String>,
}

/// Result of a bulk claim, one entry per requested id in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkClaimReport {
    /// Per-id results.
    pub results: Vec<BulkClaimItem>,
}

impl BulkClaimReport {
    /// Ids that were claimed.
    pub fn successful(&self) -> Vec<ContentId> {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.content_id)
            .collect()
    }

    /// Ids that failed, with their reasons.
    pub fn failed(&self) -> Vec<(ContentId, String)> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| (r.content_id, r.error.clone().unwrap_or_default()))
            .collect()
    }
}
