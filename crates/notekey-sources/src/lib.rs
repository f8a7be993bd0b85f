//! # notekey-sources
//!
//! Candidate sources for notekey keyword recommendation.
//!
//! This crate provides:
//! - [`TrendsClient`]: related topics from the Google Trends web API
//! - [`KeyedVectors`]: a word2vec model (text or binary format) with
//!   cosine nearest-neighbor lookup
//! - [`EmbeddingModelStore`]: process-wide, load-once access to the model
//! - [`Word2VecSource`]: the embedding candidate source built on the store
//!
//! # Example
//!
//! ```rust,no_run
//! use notekey_sources::{TrendsClient, TrendsConfig};
//! use notekey_core::TrendSource;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = TrendsClient::new(TrendsConfig::from_env()).unwrap();
//!     let candidates = client.fetch_trend_candidates("파이썬").await.unwrap();
//!     for c in candidates {
//!         println!("{} {}", c.keyword, c.score);
//!     }
//! }
//! ```

pub mod embedding;
pub mod trends;
pub mod word2vec;

// Re-export core types
pub use notekey_core::*;

pub use embedding::{EmbeddingModelConfig, EmbeddingModelStore, Word2VecSource};
pub use trends::{RankedKeyword, RelatedTopics, Topic, TrendsClient, TrendsConfig};
pub use word2vec::{KeyedVectors, ModelFormat};
