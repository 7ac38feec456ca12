//! Listing page walker
//!
//! Walks one listing: open the starting page, clear the consent gate if it is
//! shown, then follow "next" controls page by page, collecting every document
//! link along the way. The walk stops when no next control is found, when a
//! page address comes back (pagination loop), when pagination leaves the
//! listing, or when a navigation fails. URLs collected before the stop are
//! always kept.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::models::{DocumentSet, DocumentUrl, ListingSource, SkipReason};
use crate::app::progress::{ProgressEvent, ProgressSink};
use crate::app::session::{Browser, ElementMatcher, NavigationResult};
use crate::constants::walker as walker_constants;
use crate::errors::SessionResult;

pub mod config;

pub use config::WalkerConfig;

/// Result of opening a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened(NavigationResult),
    Skipped(SkipReason),
}

/// Result of the consent gate check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateOutcome {
    /// The prompt was shown, a control was activated and the prompt is gone
    Cleared,
    /// No prompt on the page (never shown, or already passed this session)
    NotPresent,
    /// The prompt was shown but none of the affirmative controls exist
    NoAffirmativeControl,
    /// The prompt was shown and no control dismissed it
    Failed { reason: String },
}

impl fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateOutcome::Cleared => f.write_str("cleared"),
            GateOutcome::NotPresent => f.write_str("not present"),
            GateOutcome::NoAffirmativeControl => f.write_str("no affirmative control"),
            GateOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Why a walk stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalkTermination {
    /// No next control on the last page
    Exhausted,
    /// The next control led back to an already visited page
    LoopDetected { url: String },
    /// Pagination led outside the listing
    LeftListing { url: String },
    /// A navigation failed; collected URLs are kept
    NavigationFailed { reason: String },
    /// Only the given page was scanned; pagination was not followed
    SinglePage,
}

impl fmt::Display for WalkTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkTermination::Exhausted => f.write_str("no further pages"),
            WalkTermination::LoopDetected { url } => write!(f, "pagination loop at {}", url),
            WalkTermination::LeftListing { url } => write!(f, "left listing at {}", url),
            WalkTermination::NavigationFailed { reason } => {
                write!(f, "navigation failed: {}", reason)
            }
            WalkTermination::SinglePage => f.write_str("single page"),
        }
    }
}

/// Everything one walk produced
#[derive(Debug, Clone, Serialize)]
pub struct WalkReport {
    /// Documents found on the walked pages
    pub documents: DocumentSet,
    /// Page addresses in visit order
    pub pages: Vec<String>,
    pub termination: WalkTermination,
}

/// Outcome of processing one listing
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ListingOutcome {
    Skipped { reason: SkipReason },
    Walked { gate: GateOutcome, report: WalkReport },
}

impl ListingOutcome {
    /// Documents found for this listing, `None` when it was skipped
    pub fn documents(&self) -> Option<&DocumentSet> {
        match self {
            ListingOutcome::Walked { report, .. } => Some(&report.documents),
            ListingOutcome::Skipped { .. } => None,
        }
    }
}

/// Drives a session through one listing at a time
pub struct PageWalker<'a> {
    config: &'a WalkerConfig,
    progress: &'a dyn ProgressSink,
}

impl<'a> PageWalker<'a> {
    pub fn new(config: &'a WalkerConfig, progress: &'a dyn ProgressSink) -> Self {
        Self { config, progress }
    }

    /// Open, clear the gate, and walk one listing
    ///
    /// Never fails: an unreachable listing is reported as skipped and walk
    /// failures end the walk with the URLs gathered so far.
    pub async fn walk_listing<B>(&self, listing: &ListingSource, session: &mut B) -> ListingOutcome
    where
        B: Browser + ?Sized,
    {
        self.visit(listing, session, true).await
    }

    /// Open, clear the gate, and collect the documents of one page
    ///
    /// Used for page lists recorded by an earlier walk: pagination is not
    /// followed.
    pub async fn scan_page<B>(&self, page: &ListingSource, session: &mut B) -> ListingOutcome
    where
        B: Browser + ?Sized,
    {
        self.visit(page, session, false).await
    }

    async fn visit<B>(&self, listing: &ListingSource, session: &mut B, paginate: bool) -> ListingOutcome
    where
        B: Browser + ?Sized,
    {
        self.progress.emit(ProgressEvent::ListingStarted { listing });
        info!("Walking listing {}", listing);

        if let OpenOutcome::Skipped(reason) = self.open(listing, session).await {
            return self.skipped(listing, reason);
        }

        let gate = self.clear_consent_gate(session).await;
        self.progress.emit(ProgressEvent::ConsentGate {
            listing,
            outcome: &gate,
        });

        let on_listing = session
            .current_url()
            .map(|url| listing.contains(url))
            .unwrap_or(false);
        if !on_listing {
            info!("Consent gate left the listing, returning to {}", listing.url());
            if let OpenOutcome::Skipped(reason) = self.open(listing, session).await {
                return self.skipped(listing, reason);
            }
        }

        let report = if paginate {
            self.walk_pages(listing, session).await
        } else {
            self.scan_current(session).await
        };
        info!(
            "Finished {}: {} pages, {} documents ({})",
            listing.label(),
            report.pages.len(),
            report.documents.len(),
            report.termination
        );
        self.progress.emit(ProgressEvent::WalkFinished {
            listing,
            report: &report,
        });

        ListingOutcome::Walked { gate, report }
    }

    fn skipped(&self, listing: &ListingSource, reason: SkipReason) -> ListingOutcome {
        warn!("Skipping listing {}: {}", listing, reason);
        self.progress.emit(ProgressEvent::ListingSkipped {
            listing,
            reason: &reason,
        });
        ListingOutcome::Skipped { reason }
    }

    /// Navigate to the listing's starting page
    ///
    /// A non-success status (typically 401/403) or a transport failure skips
    /// the listing; neither is fatal to the run.
    pub async fn open<B>(&self, listing: &ListingSource, session: &mut B) -> OpenOutcome
    where
        B: Browser + ?Sized,
    {
        let navigation = match session.navigate(listing.url()).await {
            Ok(navigation) => navigation,
            Err(e) => {
                return OpenOutcome::Skipped(SkipReason::Unreachable {
                    reason: e.to_string(),
                })
            }
        };

        if !navigation.is_success() {
            return OpenOutcome::Skipped(SkipReason::Status {
                status: navigation.status,
            });
        }

        if let Err(e) = session.wait_for_settle().await {
            return OpenOutcome::Skipped(SkipReason::Unreachable {
                reason: e.to_string(),
            });
        }

        debug!("Opened {} (status {})", navigation.final_url, navigation.status);
        OpenOutcome::Opened(navigation)
    }

    /// Dismiss the consent prompt if the current page shows it
    ///
    /// Safe to call any number of times: without a prompt this is a no-op.
    pub async fn clear_consent_gate<B>(&self, session: &mut B) -> GateOutcome
    where
        B: Browser + ?Sized,
    {
        match session.contains_text(&self.config.consent_prompt).await {
            Ok(true) => {}
            Ok(false) => return GateOutcome::NotPresent,
            Err(e) => {
                return GateOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }

        let mut last_error = None;
        for matcher in &self.config.consent_controls {
            match session.query(matcher).await {
                Ok(elements) if !elements.is_empty() => {}
                Ok(_) => continue,
                Err(e) => {
                    debug!("Consent matcher {} failed: {}", matcher, e);
                    continue;
                }
            }

            if let Err(e) = self.activate_and_settle(session, matcher).await {
                warn!("Activating consent control {} failed: {}", matcher, e);
                last_error = Some(e.to_string());
                continue;
            }

            if !self.config.gate_settle_delay.is_zero() {
                tokio::time::sleep(self.config.gate_settle_delay).await;
            }

            // Controls handled in-page (fragment links, script buttons) may leave the prompt up
            match session.contains_text(&self.config.consent_prompt).await {
                Ok(false) => {
                    info!("Consent gate cleared via {}", matcher);
                    return GateOutcome::Cleared;
                }
                Ok(true) => {
                    warn!("Consent prompt still shown after activating {}", matcher);
                    last_error = Some(format!(
                        "consent prompt still shown after activating {}",
                        matcher
                    ));
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        match last_error {
            Some(reason) => GateOutcome::Failed { reason },
            None => {
                warn!("Consent prompt shown but no affirmative control matched");
                GateOutcome::NoAffirmativeControl
            }
        }
    }

    /// Follow the pagination chain from the current page
    pub async fn walk_pages<B>(&self, listing: &ListingSource, session: &mut B) -> WalkReport
    where
        B: Browser + ?Sized,
    {
        let mut documents = DocumentSet::new();
        let mut pages = Vec::new();
        let mut visited: HashSet<Url> = HashSet::new();

        let termination = match session.current_url().cloned() {
            None => WalkTermination::NavigationFailed {
                reason: "no page loaded".to_string(),
            },
            Some(mut current) => loop {
                if !listing.contains(&current) {
                    break WalkTermination::LeftListing {
                        url: current.to_string(),
                    };
                }

                visited.insert(current.clone());
                pages.push(current.to_string());

                match self.collect_documents(session, &current).await {
                    Ok(found) => {
                        let new_documents = documents.merge(&found);
                        debug!(
                            "{}: {} document links, {} new",
                            current,
                            found.len(),
                            new_documents
                        );
                        self.progress.emit(ProgressEvent::PageScanned {
                            url: &current,
                            documents_found: found.len(),
                            new_documents,
                        });
                    }
                    Err(e) => warn!("Failed to extract links from {}: {}", current, e),
                }

                let Some(next_control) = self.find_next(listing, session, &current).await else {
                    break WalkTermination::Exhausted;
                };

                if !self.config.page_delay.is_zero() {
                    tokio::time::sleep(self.config.page_delay).await;
                }

                match self.activate_and_settle(session, next_control).await {
                    Ok(navigation) if !navigation.is_success() => {
                        break WalkTermination::NavigationFailed {
                            reason: format!(
                                "{} answered with status {}",
                                navigation.final_url, navigation.status
                            ),
                        };
                    }
                    Ok(_) => {}
                    Err(e) => {
                        break WalkTermination::NavigationFailed {
                            reason: e.to_string(),
                        };
                    }
                }

                let Some(next) = session.current_url().cloned() else {
                    break WalkTermination::NavigationFailed {
                        reason: "no page after activating next".to_string(),
                    };
                };

                if visited.contains(&next) {
                    info!("Pagination loop detected at {}", next);
                    break WalkTermination::LoopDetected {
                        url: next.to_string(),
                    };
                }

                current = next;
            },
        };

        WalkReport {
            documents,
            pages,
            termination,
        }
    }

    /// Collect the current page's documents without paginating
    async fn scan_current<B>(&self, session: &B) -> WalkReport
    where
        B: Browser + ?Sized,
    {
        let Some(current) = session.current_url().cloned() else {
            return WalkReport {
                documents: DocumentSet::new(),
                pages: Vec::new(),
                termination: WalkTermination::NavigationFailed {
                    reason: "no page loaded".to_string(),
                },
            };
        };

        let documents = match self.collect_documents(session, &current).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Failed to extract links from {}: {}", current, e);
                DocumentSet::new()
            }
        };
        self.progress.emit(ProgressEvent::PageScanned {
            url: &current,
            documents_found: documents.len(),
            new_documents: documents.len(),
        });

        WalkReport {
            documents,
            pages: vec![current.to_string()],
            termination: WalkTermination::SinglePage,
        }
    }

    /// Document links on the current page
    async fn collect_documents<B>(&self, session: &B, page: &Url) -> SessionResult<DocumentSet>
    where
        B: Browser + ?Sized,
    {
        let anchors = session
            .query(&ElementMatcher::css(walker_constants::ANCHOR_SELECTOR))
            .await?;

        Ok(anchors
            .iter()
            .filter_map(|anchor| anchor.href.as_deref())
            .filter_map(|href| DocumentUrl::from_link(page, href, &self.config.format))
            .collect())
    }

    /// First next-page matcher with a match that stays on the listing
    async fn find_next<B>(
        &self,
        listing: &ListingSource,
        session: &B,
        page: &Url,
    ) -> Option<&'a ElementMatcher>
    where
        B: Browser + ?Sized,
    {
        let config = self.config;
        for matcher in &config.next_controls {
            let elements = match session.query(matcher).await {
                Ok(elements) => elements,
                Err(e) => {
                    debug!("Next matcher {} failed: {}", matcher, e);
                    continue;
                }
            };

            let Some(first) = elements.first() else {
                continue;
            };

            let leaves_listing = first
                .href
                .as_deref()
                .and_then(|href| page.join(href).ok())
                .map(|target| !listing.contains(&target))
                .unwrap_or(false);

            if leaves_listing {
                debug!(
                    "Ignoring next control {} pointing outside the listing: {:?}",
                    matcher, first.href
                );
                continue;
            }

            return Some(matcher);
        }

        None
    }

    async fn activate_and_settle<B>(
        &self,
        session: &mut B,
        matcher: &ElementMatcher,
    ) -> SessionResult<NavigationResult>
    where
        B: Browser + ?Sized,
    {
        let navigation = session.activate(matcher).await?;
        session.wait_for_settle().await?;
        Ok(navigation)
    }
}
