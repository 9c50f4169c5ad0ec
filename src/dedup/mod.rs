//! Near-duplicate detection within one owner's library.
//!
//! Scores are computed per field and a pair is reported when any requested
//! field meets the threshold:
//!
//! | Field  | Score                                   |
//! |--------|-----------------------------------------|
//! | title  | Jaccard over 3-character shingle sets   |
//! | tags   | Jaccard over tag sets                   |
//! | urls   | 1.0 on any exact shared URL, else 0.0   |

pub mod matcher;
pub mod shingle;

pub use matcher::{DedupError, DuplicateQuery, SimilarityMatcher, CONTENT_NOT_FOUND, DEFAULT_THRESHOLD};
pub use shingle::{jaccard, shingles, title_similarity, url_overlap, SHINGLE_SIZE};
