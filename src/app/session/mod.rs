//! Browser session abstraction
//!
//! The walker and downloader only need a handful of capabilities from a
//! browser: navigate and report the response status, query and activate
//! elements by selector and visible text, wait for the page to settle, and
//! fetch a resource inside the same session so cookies are attached.
//! [`Browser`] captures exactly those.
//!
//! The module is organized into specialized components:
//! - `config`: session configuration and launch
//! - `dom`: selector and text matching over an HTML snapshot
//! - `http`: [`HttpSession`], a cookie-keeping HTTP engine behind [`Browser`]
//! - `chromium`: `ChromiumSession`, a headless Chromium engine (feature
//!   `chromium`) for gates that need scripts

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::SessionResult;

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod config;
pub mod dom;
pub mod http;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumSession;
pub use config::{SessionConfig, SessionEngine};
pub use http::HttpSession;

/// Result of navigating to a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResult {
    /// The address of the rendered page after redirects
    pub final_url: Url,
    /// HTTP status of the main document
    pub status: u16,
}

impl NavigationResult {
    /// Check if the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response of a fetch issued inside the session
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Snapshot of an element matched on the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Visible text, whitespace-normalized
    pub text: String,
    /// Raw `href` attribute, if any
    pub href: Option<String>,
}

/// Finds elements by CSS selector, optionally narrowed by visible text
///
/// The text check is a case-insensitive substring match on the element's
/// whitespace-normalized text, like a `:has-text()` pseudo-class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementMatcher {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementMatcher {
    /// Match by selector alone
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
        }
    }

    /// Narrow the matcher to elements containing `text`
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl std::fmt::Display for ElementMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{}:has-text('{}')", self.selector, text),
            None => f.write_str(&self.selector),
        }
    }
}

/// The browser capabilities consumed by the crawl-and-acquire pipeline
///
/// One implementation instance is one session: cookies obtained while
/// navigating (for example by passing a consent gate) are reused by later
/// navigations and by [`Browser::fetch`].
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate the page to `url` and report the main document status
    async fn navigate(&mut self, url: &Url) -> SessionResult<NavigationResult>;

    /// Address of the currently rendered page
    fn current_url(&self) -> Option<&Url>;

    /// Check if the rendered page shows `text` anywhere (case-insensitive)
    async fn contains_text(&self, text: &str) -> SessionResult<bool>;

    /// All elements on the current page matched by `matcher`, in document order
    async fn query(&self, matcher: &ElementMatcher) -> SessionResult<Vec<Element>>;

    /// Activate (click) the first element matched by `matcher`
    async fn activate(&mut self, matcher: &ElementMatcher) -> SessionResult<NavigationResult>;

    /// Wait until the page has stopped loading
    ///
    /// Engines whose navigation calls only return once the page is complete
    /// can keep the default.
    async fn wait_for_settle(&mut self) -> SessionResult<()> {
        Ok(())
    }

    /// Fetch a resource with the session's cookies without changing the page
    async fn fetch(&mut self, url: &Url) -> SessionResult<FetchResponse>;

    /// Release the session; every later call fails with `SessionError::Closed`
    async fn close(&mut self) -> SessionResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_display() {
        let matcher = ElementMatcher::css("a").with_text("Yes");
        assert_eq!(matcher.to_string(), "a:has-text('Yes')");
        assert_eq!(ElementMatcher::css("a[rel='next']").to_string(), "a[rel='next']");
    }

    #[test]
    fn test_navigation_success_range() {
        let url = Url::parse("https://example.gov/").unwrap();
        let ok = NavigationResult {
            final_url: url.clone(),
            status: 204,
        };
        let forbidden = NavigationResult {
            final_url: url,
            status: 403,
        };
        assert!(ok.is_success());
        assert!(!forbidden.is_success());
    }
}
