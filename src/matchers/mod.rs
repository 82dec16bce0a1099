//! The four matching strategies.
//!
//! Each matcher consumes one process's view (identity, libraries, or memory
//! chunks) and one search's criteria for its category, and reports hits as
//! pattern-indexed [`Hit`] records. The orchestrator turns hits into full
//! match elements and applies the combination policy.

pub mod bytes;
pub mod content;
pub mod library;
pub mod name;

pub use bytes::ByteMatcher;
pub use content::ContentMatcher;
pub use library::match_libraries;
pub use name::match_names;

/// One pattern hit inside a single process, before it is tied to a search
/// and process identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Index of the pattern/literal within its criteria list.
    pub pattern: usize,
    /// Virtual address of the match, for memory-based categories.
    pub offset: Option<u64>,
    /// What matched, when it differs from the pattern itself (library name,
    /// captured content text).
    pub matched: Option<String>,
}
