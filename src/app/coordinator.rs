//! Run orchestration and session lifecycle
//!
//! The coordinator owns the order of a run: every configured listing is walked
//! with the same session, the per-listing document sets are merged into one
//! deduplicated set, and the downloader runs once over that set. A listing
//! that cannot be opened or walked never affects the others.
//!
//! # Examples
//!
//! ```rust,no_run
//! use disclosure_fetcher::app::{Coordinator, CoordinatorConfig, NoProgress};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::new(CoordinatorConfig::default());
//! let summary = coordinator.execute(&NoProgress).await?;
//! println!(
//!     "{}/{} documents in {}",
//!     summary.downloads.succeeded(),
//!     summary.downloads.total(),
//!     summary.downloads.output_dir.display()
//! );
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::download::{AcquireReport, DownloadConfig, DownloadManager};
use crate::app::models::{DocumentSet, ListingSource};
use crate::app::progress::ProgressSink;
use crate::app::session::{Browser, SessionConfig};
use crate::app::walker::{ListingOutcome, PageWalker, WalkerConfig};
use crate::constants::listings;
use crate::errors::Result;

/// Everything a run needs
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Listings walked in order
    pub listings: Vec<ListingSource>,
    pub session: SessionConfig,
    pub walker: WalkerConfig,
    pub download: DownloadConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listings: listings::DEFAULT_LISTING_URLS
                .iter()
                .filter_map(|url| ListingSource::new(url, None).ok())
                .collect(),
            session: SessionConfig::default(),
            walker: WalkerConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

/// Outcome of one listing, with the listing it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct ListingReport {
    pub label: String,
    pub url: String,
    pub outcome: ListingOutcome,
}

/// Result of walking every listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    pub listings: Vec<ListingReport>,
    /// Union of all listings' documents
    pub documents: DocumentSet,
}

impl DiscoveryReport {
    /// Every visited page address, listing by listing
    pub fn pages(&self) -> impl Iterator<Item = &str> {
        self.listings
            .iter()
            .filter_map(|listing| match &listing.outcome {
                ListingOutcome::Walked { report, .. } => Some(report.pages.iter()),
                ListingOutcome::Skipped { .. } => None,
            })
            .flatten()
            .map(String::as_str)
    }

    pub fn skipped_listings(&self) -> usize {
        self.listings
            .iter()
            .filter(|listing| matches!(listing.outcome, ListingOutcome::Skipped { .. }))
            .count()
    }
}

/// Everything a full run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub discovery: DiscoveryReport,
    pub downloads: AcquireReport,
}

impl RunSummary {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Drives walker and downloader over one shared session
pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Walk every listing in order and merge their documents
    pub async fn discover<B>(&self, session: &mut B, progress: &dyn ProgressSink) -> DiscoveryReport
    where
        B: Browser + ?Sized,
    {
        let walker = PageWalker::new(&self.config.walker, progress);
        let mut discovery = DiscoveryReport::default();

        for listing in &self.config.listings {
            let outcome = walker.walk_listing(listing, session).await;
            if let Some(documents) = outcome.documents() {
                let added = discovery.documents.merge(documents);
                info!(
                    "{}: {} documents, {} new across listings (total {})",
                    listing.label(),
                    documents.len(),
                    added,
                    discovery.documents.len()
                );
            }

            discovery.listings.push(ListingReport {
                label: listing.label().to_string(),
                url: listing.url().to_string(),
                outcome,
            });
        }

        discovery
    }

    /// Scan each recorded page once, without following pagination
    pub async fn scan_pages<B>(
        &self,
        pages: &[ListingSource],
        session: &mut B,
        progress: &dyn ProgressSink,
    ) -> DiscoveryReport
    where
        B: Browser + ?Sized,
    {
        let walker = PageWalker::new(&self.config.walker, progress);
        let mut discovery = DiscoveryReport::default();

        for page in pages {
            let outcome = walker.scan_page(page, session).await;
            if let Some(documents) = outcome.documents() {
                discovery.documents.merge(documents);
            }
            discovery.listings.push(ListingReport {
                label: page.label().to_string(),
                url: page.url().to_string(),
                outcome,
            });
        }

        discovery
    }

    /// Discover, then acquire the merged set with the same session
    ///
    /// Never fails: listing and file failures are part of the summary.
    pub async fn run<B>(&self, session: &mut B, progress: &dyn ProgressSink) -> RunSummary
    where
        B: Browser + ?Sized,
    {
        let started_at = Utc::now();
        let discovery = self.discover(session, progress).await;
        self.acquire(started_at, discovery, session, progress).await
    }

    /// Scan recorded pages, then acquire their documents with the same session
    pub async fn run_pages<B>(
        &self,
        pages: &[ListingSource],
        session: &mut B,
        progress: &dyn ProgressSink,
    ) -> RunSummary
    where
        B: Browser + ?Sized,
    {
        let started_at = Utc::now();
        let discovery = self.scan_pages(pages, session, progress).await;
        self.acquire(started_at, discovery, session, progress).await
    }

    async fn acquire<B>(
        &self,
        started_at: DateTime<Utc>,
        discovery: DiscoveryReport,
        session: &mut B,
        progress: &dyn ProgressSink,
    ) -> RunSummary
    where
        B: Browser + ?Sized,
    {
        info!(
            "Discovered {} unique documents across {} sources ({} skipped)",
            discovery.documents.len(),
            discovery.listings.len(),
            discovery.skipped_listings()
        );

        let manager = DownloadManager::new(&self.config.download, progress);
        let downloads = manager.acquire(&discovery.documents, session).await;

        RunSummary {
            started_at,
            finished_at: Utc::now(),
            discovery,
            downloads,
        }
    }

    /// Launch a session, run, and close the session on every exit path
    ///
    /// # Errors
    ///
    /// Fails only when the session cannot be launched.
    pub async fn execute(&self, progress: &dyn ProgressSink) -> Result<RunSummary> {
        let mut session = self.config.session.open().await?;
        let summary = self.run(session.as_mut(), progress).await;
        Self::release(session.as_mut()).await;
        Ok(summary)
    }

    /// Launch a session, download from recorded pages, and close the session
    ///
    /// # Errors
    ///
    /// Fails only when the session cannot be launched.
    pub async fn execute_pages(
        &self,
        pages: &[ListingSource],
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary> {
        let mut session = self.config.session.open().await?;
        let summary = self.run_pages(pages, session.as_mut(), progress).await;
        Self::release(session.as_mut()).await;
        Ok(summary)
    }

    /// Launch a session, walk every listing, and close the session
    pub async fn execute_discovery(&self, progress: &dyn ProgressSink) -> Result<DiscoveryReport> {
        let mut session = self.config.session.open().await?;
        let discovery = self.discover(session.as_mut(), progress).await;
        Self::release(session.as_mut()).await;
        Ok(discovery)
    }

    async fn release<B>(session: &mut B)
    where
        B: Browser + ?Sized,
    {
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
    }
}
