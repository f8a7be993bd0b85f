//! # notekey-recommend
//!
//! Keyword recommendation for note pages.
//!
//! Given a keyword and the page it belongs to, the engine collects the
//! keywords already used across the page's note, asks one candidate source
//! (trend service or word-embedding model) for related keywords, removes the
//! ones the note already has, and draws a small weighted-random selection.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use notekey_recommend::RecommendationEngine;
//!
//! let engine = RecommendationEngine::new(pages, trends, embeddings);
//! match engine.recommend_by_embedding("파이썬", 12).await {
//!     Ok(result) => println!("{}", serde_json::to_string(&result)?),
//!     Err(err) => eprintln!("{}", serde_json::to_string(&err.to_response())?),
//! }
//! ```

pub mod engine;
pub mod error;
pub mod sampling;

#[cfg(test)]
pub(crate) mod mock;

// Re-export core types
pub use notekey_core::*;

pub use engine::{RecommendConfig, RecommendationEngine};
pub use error::{ErrorResponse, RecommendationError};
pub use sampling::select;
