//! Catalog configuration from the environment.
//!
//! | Variable           | Default       | Meaning                                    |
//! |--------------------|---------------|--------------------------------------------|
//! | `COMMUNITY_BADGES` | all badges    | Badges that unlock `aws_community` content |
//! | `DEDUP_THRESHOLD`  | `0.8`         | Per-field duplicate threshold, in [0, 1]   |
//! | `DEDUP_FIELDS`     | `title,tags`  | Fields compared by duplicate detection     |
//!
//! Unparseable entries are skipped with a warning and never fail startup.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dedup::{DuplicateQuery, DEFAULT_THRESHOLD};
use crate::policy::VisibilityPolicy;
use crate::types::{BadgeType, DuplicateField, UserId};

/// Catalog-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Badges that count as community membership.
    pub community_badges: BTreeSet<BadgeType>,
    /// Default duplicate threshold.
    pub dedup_threshold: f64,
    /// Default duplicate fields.
    pub dedup_fields: BTreeSet<DuplicateField>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            community_badges: BadgeType::ALL.into_iter().collect(),
            dedup_threshold: DEFAULT_THRESHOLD,
            dedup_fields: default_fields(),
        }
    }
}

fn default_fields() -> BTreeSet<DuplicateField> {
    [DuplicateField::Title, DuplicateField::Tags].into_iter().collect()
}

impl CatalogConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let community_badges = match lookup("COMMUNITY_BADGES") {
            Some(raw) => parse_list(&raw, "COMMUNITY_BADGES", BadgeType::from_str),
            None => defaults.community_badges,
        };

        let dedup_threshold = match lookup("DEDUP_THRESHOLD") {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(t) if t.is_finite() => t.clamp(0.0, 1.0),
                _ => {
                    tracing::warn!(value = %raw, "ignoring invalid DEDUP_THRESHOLD");
                    defaults.dedup_threshold
                }
            },
            None => defaults.dedup_threshold,
        };

        let dedup_fields = match lookup("DEDUP_FIELDS") {
            Some(raw) => {
                let fields = parse_list(&raw, "DEDUP_FIELDS", DuplicateField::from_str);
                if fields.is_empty() {
                    defaults.dedup_fields
                } else {
                    fields
                }
            }
            None => defaults.dedup_fields,
        };

        Self {
            community_badges,
            dedup_threshold,
            dedup_fields,
        }
    }

    /// Visibility policy for these settings.
    pub fn visibility_policy(&self) -> VisibilityPolicy {
        VisibilityPolicy::new(self.community_badges.iter().copied())
    }

    /// Duplicate query for `owner_id` with the configured defaults.
    pub fn duplicate_query(&self, owner_id: UserId) -> DuplicateQuery {
        DuplicateQuery::new(owner_id)
            .with_threshold(self.dedup_threshold)
            .with_fields(self.dedup_fields.iter().copied())
    }
}

fn parse_list<T: Ord>(raw: &str, key: &str, parse: fn(&str) -> Option<T>) -> BTreeSet<T> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let parsed = parse(s);
            if parsed.is_none() {
                tracing::warn!(key, value = s, "ignoring unknown entry");
            }
            parsed
        })
        .collect()
}
