//! Access policy definitions.

pub mod visibility;

pub use visibility::VisibilityPolicy;
