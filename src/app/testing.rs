//! In-memory test doubles for the browser session and progress sink

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::app::progress::{ProgressEvent, ProgressSink};
use crate::app::session::dom::{self, Activation, FormMethod};
use crate::app::session::{Browser, Element, ElementMatcher, FetchResponse, NavigationResult};
use crate::errors::{SessionError, SessionResult};

const NOT_FOUND: &str = "<html><body><h1>Not Found</h1></body></html>";

#[derive(Debug, Clone)]
struct ConsentGate {
    html: String,
    endpoint: String,
    redirect_to: String,
}

#[derive(Debug, Clone)]
struct Rendered {
    url: Url,
    status: u16,
    html: String,
}

/// A browser serving canned pages from memory
///
/// Unknown pages and resources answer 404. With a consent gate configured,
/// every known page shows the gate (and every resource answers with it) until
/// the gate endpoint has been visited, which then redirects.
#[derive(Debug, Default)]
pub struct ScriptedBrowser {
    pages: HashMap<String, (u16, String)>,
    unreachable: HashSet<String>,
    gate: Option<ConsentGate>,
    consented: bool,
    resources: HashMap<String, FetchResponse>,
    failing_resources: HashSet<String>,
    current: Option<Rendered>,
    navigations: Vec<String>,
    fetches: Vec<String>,
    closed: bool,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, html: &str) -> Self {
        self.page_with_status(url, 200, html)
    }

    pub fn page_with_status(mut self, url: &str, status: u16, html: &str) -> Self {
        self.pages
            .insert(normalize(url), (status, html.to_string()));
        self
    }

    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(normalize(url));
        self
    }

    pub fn consent_gate(mut self, html: &str, endpoint: &str, redirect_to: &str) -> Self {
        self.gate = Some(ConsentGate {
            html: html.to_string(),
            endpoint: normalize(endpoint),
            redirect_to: normalize(redirect_to),
        });
        self
    }

    pub fn resource(self, url: &str, content_type: &str, body: &[u8]) -> Self {
        self.resource_with_status(url, 200, content_type, body)
    }

    pub fn resource_with_status(
        mut self,
        url: &str,
        status: u16,
        content_type: &str,
        body: &[u8],
    ) -> Self {
        self.resources.insert(
            normalize(url),
            FetchResponse {
                status,
                content_type: Some(content_type.to_string()),
                body: body.to_vec(),
            },
        );
        self
    }

    pub fn failing_resource(mut self, url: &str) -> Self {
        self.failing_resources.insert(normalize(url));
        self
    }

    /// Every requested page address, in order
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Every fetched resource address, in order
    pub fn fetches(&self) -> &[String] {
        &self.fetches
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn rendered(&self) -> SessionResult<&Rendered> {
        self.ensure_open()?;
        self.current.as_ref().ok_or(SessionError::NoPage)
    }

    fn gated(&self) -> Option<&ConsentGate> {
        self.gate.as_ref().filter(|_| !self.consented)
    }

    fn render(&mut self, url: &Url) -> SessionResult<NavigationResult> {
        self.ensure_open()?;
        self.navigations.push(url.to_string());

        let mut key = url.to_string();
        if let Some(gate) = &self.gate {
            if key == gate.endpoint {
                self.consented = true;
                key = gate.redirect_to.clone();
            }
        }

        if self.unreachable.contains(&key) {
            return Err(SessionError::Unreachable {
                url: key,
                reason: "connection refused".to_string(),
            });
        }

        let final_url = Url::parse(&key).map_err(|e| SessionError::InvalidUrl {
            url: key.clone(),
            error: e.to_string(),
        })?;

        let (status, html) = match (self.pages.get(&key), self.gated()) {
            (Some(_), Some(gate)) => (200, gate.html.clone()),
            (Some((status, html)), None) => (*status, html.clone()),
            (None, _) => (404, NOT_FOUND.to_string()),
        };

        self.current = Some(Rendered {
            url: final_url.clone(),
            status,
            html,
        });
        Ok(NavigationResult { final_url, status })
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn navigate(&mut self, url: &Url) -> SessionResult<NavigationResult> {
        self.render(url)
    }

    fn current_url(&self) -> Option<&Url> {
        self.rendered().ok().map(|page| &page.url)
    }

    async fn contains_text(&self, text: &str) -> SessionResult<bool> {
        Ok(dom::contains_text(&self.rendered()?.html, text))
    }

    async fn query(&self, matcher: &ElementMatcher) -> SessionResult<Vec<Element>> {
        dom::query(&self.rendered()?.html, matcher)
    }

    async fn activate(&mut self, matcher: &ElementMatcher) -> SessionResult<NavigationResult> {
        let page = self.rendered()?.clone();
        let resolve = |href: &str| {
            page.url.join(href).map_err(|e| SessionError::InvalidUrl {
                url: href.to_string(),
                error: e.to_string(),
            })
        };

        match dom::activation(&page.html, matcher)? {
            Activation::InPage => Ok(NavigationResult {
                final_url: page.url.clone(),
                status: page.status,
            }),
            Activation::Follow(href) => {
                let target = resolve(&href)?;
                self.render(&target)
            }
            Activation::Submit(form) => {
                let mut target = match form.action.as_deref() {
                    Some(action) => resolve(action)?,
                    None => page.url.clone(),
                };
                if form.method == FormMethod::Get && !form.fields.is_empty() {
                    target
                        .query_pairs_mut()
                        .clear()
                        .extend_pairs(form.fields.iter());
                }
                self.render(&target)
            }
        }
    }

    async fn fetch(&mut self, url: &Url) -> SessionResult<FetchResponse> {
        self.ensure_open()?;
        let key = url.to_string();
        self.fetches.push(key.clone());

        if self.failing_resources.contains(&key) {
            return Err(SessionError::Unreachable {
                url: key,
                reason: "connection reset".to_string(),
            });
        }

        if let Some(gate) = self.gated() {
            return Ok(FetchResponse {
                status: 200,
                content_type: Some("text/html".to_string()),
                body: gate.html.clone().into_bytes(),
            });
        }

        Ok(self.resources.get(&key).cloned().unwrap_or(FetchResponse {
            status: 404,
            content_type: Some("text/html".to_string()),
            body: NOT_FOUND.as_bytes().to_vec(),
        }))
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.closed = true;
        self.current = None;
        Ok(())
    }
}

/// Records the kind of every event it receives
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingProgress {
    pub fn count(&self, kind: &str) -> usize {
        self.events()
            .iter()
            .filter(|recorded| **recorded == kind)
            .count()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: ProgressEvent<'_>) {
        let kind = match event {
            ProgressEvent::ListingStarted { .. } => "listing_started",
            ProgressEvent::ListingSkipped { .. } => "listing_skipped",
            ProgressEvent::ConsentGate { .. } => "consent_gate",
            ProgressEvent::PageScanned { .. } => "page_scanned",
            ProgressEvent::WalkFinished { .. } => "walk_finished",
            ProgressEvent::DownloadStarted { .. } => "download_started",
            ProgressEvent::FileFinished { .. } => "file_finished",
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(kind);
        }
    }
}
