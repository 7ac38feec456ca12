//! Prelude module for Disclosure Fetcher Library
//!
//! Re-exports the items most integrations need, so a single
//! `use disclosure_fetcher::prelude::*;` is enough for typical usage.
//!
//! # Usage
//!
//! ```rust,no_run
//! use disclosure_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?.to_coordinator_config()?;
//!     let summary = Coordinator::new(config).execute(&NoProgress).await?;
//!     println!("{} documents acquired", summary.downloads.succeeded());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Orchestration and configuration
pub use crate::app::{Coordinator, CoordinatorConfig, DiscoveryReport, RunSummary};
pub use crate::config::AppConfig;

// Pipeline components
pub use crate::app::{
    AcquireOutcome, AcquireReport, Browser, DocumentSet, DocumentUrl, DownloadConfig,
    DownloadManager, ElementMatcher, GateOutcome, HttpSession, ListingOutcome, ListingSource,
    NoProgress, PageWalker, ProgressEvent, ProgressSink, SessionConfig, WalkTermination,
    WalkerConfig,
};

// Commonly used constants
pub use crate::constants::{DEFAULT_LISTING_URLS, DEFAULT_OUTPUT_DIR, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};

pub use tokio;
