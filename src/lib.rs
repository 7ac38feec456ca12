//! Disclosure Fetcher Library
//!
//! Walks paginated, consent-gated document listings through one browser
//! session, collects a deduplicated set of PDF links, and downloads them
//! idempotently with staging files and atomic renames.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
