//! Visibility policy: who may read what.
//!
//! ## Rules
//!
//! Evaluated in order, first match wins:
//!
//! 1. Owner → allow
//! 2. Admin → allow
//! 3. `private` → deny
//! 4. `aws_only` → allow iff AWS employee
//! 5. `aws_community` → allow iff AWS employee or holder of a community-eligible badge
//! 6. `public` → allow, including anonymous viewers
//!
//! Rules 3-6 depend only on the viewer and the tier, so they can be
//! precomputed into a tier list. Every store backend filters with either
//! [`VisibilityPolicy::allows`] (per row) or [`VisibilityPolicy::visible_tiers`]
//! (bound into SQL as `owner_id = $viewer OR visibility = ANY($tiers)`),
//! which keeps listing and search paths on the same rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{BadgeType, Content, Viewer, Visibility};

/// Visibility policy with a configurable set of community-eligible badges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPolicy {
    /// Badges that grant access to `aws_community` content.
    pub community_badges: BTreeSet<BadgeType>,
}

impl VisibilityPolicy {
    /// Create a policy admitting the given badges to `aws_community`.
    pub fn new(community_badges: impl IntoIterator<Item = BadgeType>) -> Self {
        Self {
            community_badges: community_badges.into_iter().collect(),
        }
    }

    /// Whether `viewer` may read `content`.
    ///
    /// Pure and deterministic. Soft-delete is not considered here; stores
    /// exclude deleted rows before applying the policy.
    pub fn allows(&self, viewer: &Viewer, content: &Content) -> bool {
        if let (Some(viewer_id), Some(owner_id)) = (viewer.id(), content.owner_id) {
            if viewer_id == owner_id {
                return true;
            }
        }
        if viewer.is_admin() {
            return true;
        }
        self.tier_allows(viewer, content.visibility)
    }

    /// Tier-only rules (3-6), ignoring ownership.
    pub fn tier_allows(&self, viewer: &Viewer, visibility: Visibility) -> bool {
        if viewer.is_admin() {
            return true;
        }
        match visibility {
            Visibility::Private => false,
            Visibility::AwsOnly => viewer.is_aws_employee(),
            Visibility::AwsCommunity => {
                viewer.is_aws_employee() || self.holds_community_badge(viewer)
            }
            Visibility::Public => true,
        }
    }

    /// Tiers `viewer` can read regardless of ownership.
    pub fn visible_tiers(&self, viewer: &Viewer) -> Vec<Visibility> {
        Visibility::ALL
            .into_iter()
            .filter(|tier| self.tier_allows(viewer, *tier))
            .collect()
    }

    /// Whether `viewer` holds at least one active community-eligible badge.
    pub fn holds_community_badge(&self, viewer: &Viewer) -> bool {
        viewer
            .active_badges()
            .any(|badge| self.community_badges.contains(badge))
    }
}

/// Every badge type is community-eligible by default.
impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::new(BadgeType::ALL)
    }
}
