//! Core types for the content catalog.

pub mod content;
pub mod viewer;
pub mod query;
pub mod duplicate;
pub mod claim;

pub use content::{Content, ContentError, ContentId, ContentType, UserId, Visibility};
pub use viewer::{BadgeType, Viewer, ViewerProfile};
pub use query::{DateRange, QueryOptions, SearchFilters, SortField, SortOption, SortOrder, TagCount};
pub use duplicate::{DuplicateCandidate, DuplicateField};
pub use claim::{BulkClaimItem, BulkClaimReport, ClaimMode, ClaimOutcome, CLAIM_CONFLICT_REASON};
