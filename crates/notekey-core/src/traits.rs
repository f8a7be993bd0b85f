//! Collaborator traits for the recommendation engine.
//!
//! These traits define the narrow interfaces the orchestrator consumes,
//! enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Candidate, PageKeyword};

// =============================================================================
// PAGE STORE
// =============================================================================

/// Read-only access to pages and the keywords assigned to them.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Resolve a page to the note that owns it. `None` when the page is unknown.
    async fn find_note_id_by_page_id(&self, page_id: i64) -> Result<Option<i64>>;

    /// All (page id, keyword) pairs for pages of a note.
    async fn find_keywords_by_note_id(&self, note_id: i64) -> Result<Vec<PageKeyword>>;
}

// =============================================================================
// CANDIDATE SOURCES
// =============================================================================

/// Candidate generation from an external search-trend service.
#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Related topics for a keyword, each scored by reported relevance.
    async fn fetch_trend_candidates(&self, keyword: &str) -> Result<Vec<Candidate>>;
}

/// Candidate generation from a static word-embedding model.
#[async_trait]
pub trait EmbeddingSource: Send + Sync {
    /// The `top_n` nearest neighbors of a keyword in the embedding space.
    ///
    /// A keyword missing from the vocabulary is an error, not an empty list.
    async fn fetch_embedding_candidates(&self, keyword: &str, top_n: usize)
        -> Result<Vec<Candidate>>;
}
