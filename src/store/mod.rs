//! Content storage backends.
//!
//! Every read composes three predicate layers:
//!
//! 1. `deleted_at IS NULL`
//! 2. the [`VisibilityPolicy`](crate::policy::VisibilityPolicy) for the supplied viewer
//! 3. the method-specific filter
//!
//! Absent and restricted rows are indistinguishable to callers.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::types::{
    ClaimMode, Content, ContentId, ContentType, QueryOptions, SearchFilters, TagCount, UserId,
    Viewer, Visibility,
};

/// Trait for content storage backends.
///
/// Implementations must order results deterministically (see
/// [`SortOption`](crate::types::SortOption)) and must implement `claim` as a
/// single conditional update, never a read followed by a write.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether an error is a uniqueness/constraint violation.
    fn is_constraint_violation(error: &Self::Error) -> bool;

    /// Content owned by `owner_id` that `viewer` may read.
    async fn find_by_user_id(
        &self,
        owner_id: &UserId,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error>;

    /// Content of one type that `viewer` may read.
    async fn find_by_content_type(
        &self,
        content_type: ContentType,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error>;

    /// Content in one visibility tier that `viewer` may read.
    async fn find_by_visibility(
        &self,
        visibility: Visibility,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error>;

    /// Public content.
    async fn find_public_content(&self, options: &QueryOptions) -> Result<Vec<Content>, Self::Error>;

    /// Content carrying any of `tags`. No tags matches nothing.
    async fn find_by_tags(
        &self,
        tags: &[String],
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error>;

    /// A single row, or `None` if absent, deleted, or not visible.
    async fn find_by_id_for_viewer(
        &self,
        id: &ContentId,
        viewer: &Viewer,
    ) -> Result<Option<Content>, Self::Error>;

    /// Case-insensitive literal substring search over title, description
    /// and tags. An empty keyword or inverted date range returns nothing.
    async fn search_content(
        &self,
        keyword: &str,
        filters: &SearchFilters,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error>;

    /// Content created within the last `days` days.
    async fn find_recent_content(
        &self,
        days: u32,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error>;

    /// Most used tags across visible content, count descending then tag.
    async fn get_popular_tags(
        &self,
        viewer: &Viewer,
        limit: usize,
    ) -> Result<Vec<TagCount>, Self::Error>;

    /// Every row `viewer` may read, unordered.
    async fn find_visible(&self, viewer: &Viewer) -> Result<Vec<Content>, Self::Error>;

    /// Unclaimed content whose original author matches `author`
    /// case-insensitively.
    async fn find_unclaimed_by_author(
        &self,
        author: &str,
        viewer: &Viewer,
        options: &QueryOptions,
    ) -> Result<Vec<Content>, Self::Error>;

    /// Guarded ownership transfer.
    ///
    /// Sets `owner_id`, `is_claimed = true`, `claimed_at = now` and bumps
    /// `version` on a non-deleted row, additionally requiring
    /// `is_claimed = false` under [`ClaimMode::Guarded`]. Returns `None`
    /// when zero rows were affected.
    async fn claim(
        &self,
        id: &ContentId,
        new_owner: &UserId,
        mode: ClaimMode,
    ) -> Result<Option<Content>, Self::Error>;

    /// Insert a new row. Used by ingestion tooling and fixtures.
    async fn insert(&self, content: Content) -> Result<Content, Self::Error>;

    /// Attach a URL to a non-deleted row and bump its version.
    /// Repeating a URL on the same content is a constraint violation.
    async fn add_url(&self, id: &ContentId, url: &str) -> Result<Content, Self::Error>;

    /// Mark a row deleted and bump its version. Returns false if the row
    /// was absent or already deleted.
    async fn soft_delete(&self, id: &ContentId) -> Result<bool, Self::Error>;
}

/// Badge-lookup collaborator: resolves a user id to a full viewer.
#[async_trait]
pub trait ViewerDirectory: Send + Sync {
    /// Error type for lookups.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolve roles and active badges. `None` and unknown ids resolve to
    /// [`Viewer::Anonymous`].
    async fn resolve_viewer(&self, user_id: Option<&UserId>) -> Result<Viewer, Self::Error>;
}

/// Trim a search keyword; `None` when nothing is left.
pub fn normalize_keyword(keyword: &str) -> Option<String> {
    let trimmed = keyword.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Escape `LIKE` metacharacters so the keyword matches literally.
///
/// Use with `ESCAPE '\'`.
pub fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Earliest `created_at` for a "last `days` days" listing.
///
/// `None` when the window reaches past the earliest representable time,
/// which means no lower bound.
pub fn recent_cutoff(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
}

pub use memory::{InMemoryContentStore, InMemoryViewerDirectory};

#[cfg(feature = "postgres")]
pub use postgres::PostgresContentStore;
