//! # notekey-db
//!
//! PostgreSQL database layer for notekey.
//!
//! This crate provides:
//! - Connection pool management
//! - The page store the recommendation engine reads existing keywords from
//!
//! ## Example
//!
//! ```rust,ignore
//! use notekey_db::{create_pool, PgPageStore, PageStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool("postgres://localhost/notekey").await?;
//!     let pages = PgPageStore::new(pool);
//!
//!     if let Some(note_id) = pages.find_note_id_by_page_id(7).await? {
//!         let keywords = pages.find_keywords_by_note_id(note_id).await?;
//!         println!("note {} uses {} keywords", note_id, keywords.len());
//!     }
//!     Ok(())
//! }
//! ```
pub mod pages;
pub mod pool;

// Re-export core types
pub use notekey_core::*;

pub use pages::PgPageStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use sqlx::PgPool;
