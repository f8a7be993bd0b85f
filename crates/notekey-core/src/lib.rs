//! # notekey-core
//!
//! Core types, traits, and abstractions for the notekey keyword
//! recommendation engine.
//!
//! This crate provides the data structures shared by the candidate sources,
//! the page store, and the recommendation orchestrator, plus the error
//! taxonomy every layer reports through.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use models::*;
pub use traits::*;
