//! Core application logic for Disclosure Fetcher
//!
//! This module contains the crawl-and-acquire pipeline: the browser session
//! abstraction and its HTTP engine, the listing walker, the document
//! downloader, and the coordinator that runs them over one shared session.
//!
//! # Examples
//!
//! ```rust,no_run
//! use disclosure_fetcher::app::{
//!     DownloadConfig, DownloadManager, ListingSource, NoProgress, PageWalker, SessionConfig,
//!     WalkerConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = SessionConfig::default().launch()?;
//! let listing = ListingSource::new(
//!     "https://www.justice.gov/epstein/doj-disclosures/data-set-9-files",
//!     None,
//! )?;
//!
//! let walker_config = WalkerConfig::default();
//! let walker = PageWalker::new(&walker_config, &NoProgress);
//! let outcome = walker.walk_listing(&listing, &mut session).await;
//!
//! if let Some(documents) = outcome.documents() {
//!     let download_config = DownloadConfig::new("disclosure_documents");
//!     let manager = DownloadManager::new(&download_config, &NoProgress);
//!     let report = manager.acquire(documents, &mut session).await;
//!     println!("{}/{} acquired", report.succeeded(), report.total());
//! }
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod download;
pub mod models;
pub mod progress;
pub mod session;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main public API
pub use coordinator::{
    Coordinator, CoordinatorConfig, DiscoveryReport, ListingReport, RunSummary,
};
pub use download::{AcquireOutcome, AcquireReport, DownloadConfig, DownloadManager, FileReport};
pub use models::{DocumentFormat, DocumentSet, DocumentUrl, ListingSource, SkipReason};
pub use progress::{NoProgress, ProgressEvent, ProgressSink};
#[cfg(feature = "chromium")]
pub use session::ChromiumSession;
pub use session::{
    Browser, Element, ElementMatcher, FetchResponse, HttpSession, NavigationResult, SessionConfig,
    SessionEngine,
};
pub use walker::{
    GateOutcome, ListingOutcome, OpenOutcome, PageWalker, WalkReport, WalkTermination,
    WalkerConfig,
};
