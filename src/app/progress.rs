//! Progress events emitted by the crawl-and-acquire pipeline
//!
//! The core never prints. It reports what happens through a [`ProgressSink`];
//! the CLI renders the events as console lines, tests record them.

use url::Url;

use crate::app::download::AcquireOutcome;
use crate::app::models::{DocumentUrl, ListingSource, SkipReason};
use crate::app::walker::{GateOutcome, WalkReport};

/// Something observable happened during a run
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// A listing walk is starting
    ListingStarted { listing: &'a ListingSource },
    /// The listing could not be opened and was abandoned
    ListingSkipped {
        listing: &'a ListingSource,
        reason: &'a SkipReason,
    },
    /// The consent gate check finished
    ConsentGate {
        listing: &'a ListingSource,
        outcome: &'a GateOutcome,
    },
    /// Document links were extracted from one page
    PageScanned {
        url: &'a Url,
        documents_found: usize,
        new_documents: usize,
    },
    /// A listing walk terminated
    WalkFinished {
        listing: &'a ListingSource,
        report: &'a WalkReport,
    },
    /// Downloading is about to start
    DownloadStarted { total: usize },
    /// One document reached its final outcome
    FileFinished {
        url: &'a DocumentUrl,
        file_name: &'a str,
        outcome: &'a AcquireOutcome,
    },
}

/// Receives progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent<'_>);
}

/// Discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent<'_>) {}
}
