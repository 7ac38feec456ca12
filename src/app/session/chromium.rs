//! Headless Chromium engine
//!
//! [`ChromiumSession`] renders listing pages in a real browser, so consent
//! gates driven by script (a "Yes" button with a click handler, a fragment
//! link that sets a cookie) work as they do for a visitor. Element queries run
//! over the rendered DOM with the same matching rules as the HTTP engine;
//! activation clicks the element inside the page. Document fetches go through
//! an HTTP client carrying the page's cookies.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as Chromium, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::http::{fetch_response, transport_error};
use super::{dom, Browser, Element, ElementMatcher, FetchResponse, NavigationResult, SessionConfig};
use crate::constants::http;
use crate::errors::{SessionError, SessionResult};

/// Status of the main document, from the navigation timing entry
const STATUS_SCRIPT: &str = "(() => { \
    const entry = performance.getEntriesByType('navigation')[0]; \
    return entry && entry.responseStatus ? entry.responseStatus : 200; \
})()";

const READY_STATE_SCRIPT: &str = "document.readyState";

/// Locate a Chromium executable
///
/// Order: the configured path, the `DISCLOSURE_FETCHER_CHROMIUM` environment
/// variable, then the usual executable names on `PATH`.
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured.filter(|path| path.exists()) {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(http::CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    http::CHROMIUM_BINARIES
        .iter()
        .find_map(|name| which::which(name).ok())
}

fn engine_error(error: impl std::fmt::Display) -> SessionError {
    SessionError::Engine {
        reason: error.to_string(),
    }
}

/// JavaScript clicking the first element `matcher` selects
///
/// Text matching mirrors `dom::query`: case-insensitive substring over the
/// whitespace-normalized text.
fn click_script(matcher: &ElementMatcher) -> SessionResult<String> {
    let selector = serde_json::to_string(&matcher.selector).map_err(engine_error)?;
    let text = serde_json::to_string(&matcher.text).map_err(engine_error)?;
    Ok(format!(
        "(() => {{ \
            const wanted = {text}; \
            const norm = (s) => (s || '').replace(/\\s+/g, ' ').trim().toLowerCase(); \
            const element = Array.from(document.querySelectorAll({selector})) \
                .find((e) => wanted === null || norm(e.innerText || e.textContent).includes(norm(wanted))); \
            if (!element) {{ return false; }} \
            element.click(); \
            return true; \
        }})()",
        text = text,
        selector = selector,
    ))
}

/// Browser session rendered by a headless Chromium instance
pub struct ChromiumSession {
    browser: Chromium,
    handler: JoinHandle<()>,
    page: Option<Page>,
    client: Client,
    current: Option<Url>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    /// Start Chromium and open one blank tab
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Engine` when no executable is found or Chromium
    /// fails to start.
    pub async fn launch(config: &SessionConfig) -> SessionResult<Self> {
        let executable = find_chromium(config.chromium_path.as_deref()).ok_or_else(|| {
            engine_error(format!(
                "Chromium executable not found; set session.chromium_path or {}",
                http::CHROMIUM_PATH_ENV
            ))
        })?;

        let browser_config = BrowserConfig::builder()
            .chrome_executable(&executable)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", config.user_agent))
            .arg(format!("--lang={}", config.locale))
            .build()
            .map_err(engine_error)?;

        let (browser, mut handler) = Chromium::launch(browser_config)
            .await
            .map_err(engine_error)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Chromium event handler: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(engine_error)?;
        let client = config.build_http_client()?;

        info!(
            "Launched Chromium session ({}, timeout: {:?})",
            executable.display(),
            config.request_timeout
        );

        Ok(Self {
            browser,
            handler,
            page: Some(page),
            client,
            current: None,
            navigation_timeout: config.request_timeout,
        })
    }

    fn page(&self) -> SessionResult<&Page> {
        self.page.as_ref().ok_or(SessionError::Closed)
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> SessionResult<T> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(engine_error)?
            .into_value()
            .map_err(|e| engine_error(format!("{:?}", e)))
    }

    async fn html(&self) -> SessionResult<String> {
        self.page()?.content().await.map_err(engine_error)
    }

    /// Wait for the load to finish, then record address and status
    async fn settled(&mut self, requested: &Url) -> SessionResult<NavigationResult> {
        self.wait_until_complete().await?;

        let final_url = self
            .page()?
            .url()
            .await
            .map_err(engine_error)?
            .and_then(|url| Url::parse(&url).ok())
            .unwrap_or_else(|| requested.clone());
        let status = match self.evaluate::<u16>(STATUS_SCRIPT).await {
            Ok(status) => status,
            Err(e) => {
                warn!("No navigation status for {}: {}", final_url, e);
                200
            }
        };

        debug!("Rendered {} (status {})", final_url, status);
        self.current = Some(final_url.clone());
        Ok(NavigationResult { final_url, status })
    }

    async fn wait_until_complete(&self) -> SessionResult<()> {
        if let Err(e) = self.page()?.wait_for_navigation().await {
            debug!("Waiting for navigation failed: {}", e);
        }

        let deadline = Instant::now() + self.navigation_timeout;
        loop {
            let state: String = self.evaluate(READY_STATE_SCRIPT).await?;
            if state == "complete" {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(engine_error(format!(
                    "page still {} after {:?}",
                    state, self.navigation_timeout
                )));
            }
            tokio::time::sleep(http::SETTLE_POLL).await;
        }
    }

    /// `Cookie` header value with every cookie the page currently holds
    async fn cookie_header(&self) -> SessionResult<String> {
        let cookies = self.page()?.get_cookies().await.map_err(engine_error)?;
        Ok(cookies
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; "))
    }
}

#[async_trait]
impl Browser for ChromiumSession {
    async fn navigate(&mut self, url: &Url) -> SessionResult<NavigationResult> {
        debug!("Navigating to {}", url);
        let navigation =
            tokio::time::timeout(self.navigation_timeout, self.page()?.goto(url.as_str())).await;

        match navigation {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(SessionError::Unreachable {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(SessionError::Unreachable {
                    url: url.to_string(),
                    reason: format!("no response within {:?}", self.navigation_timeout),
                })
            }
        }

        self.settled(url).await
    }

    fn current_url(&self) -> Option<&Url> {
        self.page.as_ref().and(self.current.as_ref())
    }

    async fn contains_text(&self, text: &str) -> SessionResult<bool> {
        Ok(dom::contains_text(&self.html().await?, text))
    }

    async fn query(&self, matcher: &ElementMatcher) -> SessionResult<Vec<Element>> {
        dom::query(&self.html().await?, matcher)
    }

    async fn activate(&mut self, matcher: &ElementMatcher) -> SessionResult<NavigationResult> {
        let origin = self.current.clone().ok_or(SessionError::NoPage)?;

        let clicked: bool = self.evaluate(&click_script(matcher)?).await?;
        if !clicked {
            return Err(SessionError::ElementNotFound {
                selector: matcher.to_string(),
            });
        }

        debug!("Clicked {} on {}", matcher, origin);
        tokio::time::sleep(http::CLICK_GRACE).await;
        self.settled(&origin).await
    }

    async fn wait_for_settle(&mut self) -> SessionResult<()> {
        self.wait_until_complete().await
    }

    async fn fetch(&mut self, url: &Url) -> SessionResult<FetchResponse> {
        let cookies = self.cookie_header().await?;

        let mut request = self.client.get(url.as_str());
        if !cookies.is_empty() {
            request = request.header(COOKIE, cookies);
        }

        let response = request.send().await.map_err(|e| transport_error(url, e))?;
        let fetched = fetch_response(response).await?;
        debug!(
            "Fetched {} (status {}, {} bytes)",
            url,
            fetched.status,
            fetched.body.len()
        );
        Ok(fetched)
    }

    async fn close(&mut self) -> SessionResult<()> {
        let page = self.page.take().ok_or(SessionError::Closed)?;
        self.current = None;

        if let Err(e) = page.close().await {
            warn!("Failed to close Chromium tab: {}", e);
        }
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close Chromium: {}", e);
        }
        self.handler.abort();

        info!("Chromium session closed");
        Ok(())
    }
}
