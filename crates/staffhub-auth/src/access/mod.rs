//! Property-access authorization cache.

pub mod cache;

pub use cache::AccessCache;
