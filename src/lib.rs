//! # content-access-kernel
//!
//! Visibility-aware content catalog core.
//!
//! The kernel answers three questions about a shared content catalog:
//!
//! > Who may read this item? Which of my items look like duplicates?
//! > Who owns this item once several people try to claim it?
//!
//! ## Core Contract
//!
//! 1. Every read is filtered by [`VisibilityPolicy`] against the caller's [`Viewer`]
//! 2. Duplicate detection scores title, tags and URLs within one owner's library
//! 3. Claims are a single guarded update: concurrent guarded claims on one item
//!    produce exactly one winner, and losers get a value, not an error
//!
//! ## Architecture
//!
//! ```text
//! Viewer ──▶ VisibilityPolicy ──▶ ContentStore (Postgres or Memory)
//!                                   ▲        ▲          ▲
//!               SimilarityMatcher ──┘        │          └── SearchRanker ◀── EngagementSource
//!                                   ClaimCoordinator
//! ```
//!
//! ## Guarantees
//!
//! - Soft-deleted rows never appear in reads, duplicate scans or claims
//! - Every successful claim increments `version` by exactly one
//! - List orders are total: `publish_date` NULLs last, then `id`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod store;
pub mod dedup;
pub mod claim;
pub mod ranker;
pub mod config;
pub mod telemetry;
pub mod schema;

// Re-exports
pub use types::{
    BadgeType, BulkClaimItem, BulkClaimReport, ClaimMode, ClaimOutcome, Content, ContentError,
    ContentId, ContentType, DateRange, DuplicateCandidate, DuplicateField, QueryOptions,
    SearchFilters, SortField, SortOption, SortOrder, TagCount, UserId, Viewer, ViewerProfile,
    Visibility, CLAIM_CONFLICT_REASON,
};
pub use policy::VisibilityPolicy;
pub use store::{ContentStore, InMemoryContentStore, InMemoryViewerDirectory, ViewerDirectory};
#[cfg(feature = "postgres")]
pub use store::PostgresContentStore;
pub use dedup::{DedupError, DuplicateQuery, SimilarityMatcher};
pub use claim::{ClaimCoordinator, ClaimError};
pub use ranker::{EngagementSource, RankerError, SearchRanker, StaticEngagement};
pub use config::CatalogConfig;
pub use telemetry::init_tracing;

/// Schema version for all catalog types.
/// Increment on breaking changes to any persisted or serialized type.
pub const CATALOG_SCHEMA_VERSION: &str = "1.0.0";
