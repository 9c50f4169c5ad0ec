//! Shingle and Jaccard primitives.
//!
//! Titles are compared by the Jaccard index of their 3-character shingle
//! sets: lowercase, pad with one space on each side, slide a 3-char window.
//! Everything is computed over `char`s, so multi-byte titles shingle the
//! same way ASCII ones do.

use std::collections::BTreeSet;

/// Shingle width.
pub const SHINGLE_SIZE: usize = 3;

/// 3-character shingles of `text`.
///
/// Empty when the padded text is shorter than one shingle.
pub fn shingles(text: &str) -> BTreeSet<String> {
    let padded: Vec<char> = std::iter::once(' ')
        .chain(text.to_lowercase().chars())
        .chain(std::iter::once(' '))
        .collect();

    padded
        .windows(SHINGLE_SIZE)
        .map(|w| w.iter().collect())
        .collect()
}

/// |A ∩ B| / |A ∪ B|, or 0 when either set is empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Title similarity: Jaccard over shingle sets.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    jaccard(&shingles(a), &shingles(b))
}

/// 1.0 if the lists share any exact URL, else 0.0.
pub fn url_overlap(a: &[String], b: &[String]) -> f64 {
    if a.iter().any(|u| b.contains(u)) {
        1.0
    } else {
        0.0
    }
}
