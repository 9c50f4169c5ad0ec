//! Viewer descriptors supplied by the caller for every read.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::content::UserId;

/// Badge granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeType {
    /// Community Builder program member.
    CommunityBuilder,
    /// AWS Hero.
    Hero,
    /// AWS Ambassador.
    Ambassador,
    /// User group leader.
    UserGroupLeader,
}

impl BadgeType {
    /// Every badge type.
    pub const ALL: [BadgeType; 4] = [
        Self::CommunityBuilder,
        Self::Hero,
        Self::Ambassador,
        Self::UserGroupLeader,
    ];

    /// Parse a badge from its stored string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "community_builder" => Some(Self::CommunityBuilder),
            "hero" => Some(Self::Hero),
            "ambassador" => Some(Self::Ambassador),
            "user_group_leader" => Some(Self::UserGroupLeader),
            _ => None,
        }
    }

    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommunityBuilder => "community_builder",
            Self::Hero => "hero",
            Self::Ambassador => "ambassador",
            Self::UserGroupLeader => "user_group_leader",
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerProfile {
    /// User id.
    pub id: UserId,
    /// Admins can read everything.
    pub is_admin: bool,
    /// AWS employees can read `aws_only` and `aws_community` content.
    pub is_aws_employee: bool,
    /// Badges currently active for this user.
    #[serde(default)]
    pub active_badges: BTreeSet<BadgeType>,
}

/// Who is reading. Not persisted by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewer {
    /// Unauthenticated reader.
    Anonymous,
    /// Authenticated reader.
    User(ViewerProfile),
}

impl Viewer {
    /// A regular authenticated user with no roles or badges.
    pub fn user(id: UserId) -> Self {
        Self::User(ViewerProfile {
            id,
            is_admin: false,
            is_aws_employee: false,
            active_badges: BTreeSet::new(),
        })
    }

    /// An admin user.
    pub fn admin(id: UserId) -> Self {
        Self::User(ViewerProfile {
            id,
            is_admin: true,
            is_aws_employee: false,
            active_badges: BTreeSet::new(),
        })
    }

    /// An AWS employee.
    pub fn aws_employee(id: UserId) -> Self {
        Self::User(ViewerProfile {
            id,
            is_admin: false,
            is_aws_employee: true,
            active_badges: BTreeSet::new(),
        })
    }

    /// Add an active badge. No-op for anonymous viewers.
    pub fn with_badge(mut self, badge: BadgeType) -> Self {
        if let Self::User(profile) = &mut self {
            profile.active_badges.insert(badge);
        }
        self
    }

    /// User id, if authenticated.
    pub fn id(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(profile) => Some(profile.id),
        }
    }

    /// Whether this viewer is an admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::User(p) if p.is_admin)
    }

    /// Whether this viewer is an AWS employee.
    pub fn is_aws_employee(&self) -> bool {
        matches!(self, Self::User(p) if p.is_aws_employee)
    }

    /// Active badges (empty for anonymous viewers).
    pub fn active_badges(&self) -> impl Iterator<Item = &BadgeType> {
        match self {
            Self::Anonymous => None,
            Self::User(profile) => Some(profile.active_badges.iter()),
        }
        .into_iter()
        .flatten()
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::Anonymous
    }
}
