//! HTTP session engine
//!
//! [`HttpSession`] renders pages as the server sends them: navigation is a GET
//! through a cookie-keeping client, the response body is the DOM snapshot, and
//! activating an element follows its link or submits its form. It runs no
//! scripts, which is enough for consent gates that set a cookie through a
//! link or a form post.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::{Client, RequestBuilder};
use url::Url;

use super::dom::{self, Activation, FormMethod};
use super::{Browser, Element, ElementMatcher, FetchResponse, NavigationResult};
use crate::errors::{SessionError, SessionResult};

/// The page currently rendered in the session
#[derive(Debug, Clone)]
struct RenderedPage {
    url: Url,
    status: u16,
    html: String,
}

/// Browser session backed by a reqwest client with a cookie store
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    page: Option<RenderedPage>,
    closed: bool,
}

impl HttpSession {
    /// Wrap an already configured client; see `SessionConfig::launch`
    pub fn new(client: Client) -> Self {
        Self {
            client,
            page: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn page(&self) -> SessionResult<&RenderedPage> {
        self.ensure_open()?;
        self.page.as_ref().ok_or(SessionError::NoPage)
    }

    fn resolve(base: &Url, href: &str) -> SessionResult<Url> {
        base.join(href).map_err(|e| SessionError::InvalidUrl {
            url: href.to_string(),
            error: e.to_string(),
        })
    }

    /// Send a document request and make its response the current page
    async fn load(&mut self, url: &Url, request: RequestBuilder) -> SessionResult<NavigationResult> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let html = response.text().await?;

        tracing::debug!(
            "Rendered {} (status {}, {} bytes)",
            final_url,
            status,
            html.len()
        );

        self.page = Some(RenderedPage {
            url: final_url.clone(),
            status,
            html,
        });

        Ok(NavigationResult { final_url, status })
    }
}

/// Connection failures and timeouts become `Unreachable`
pub(super) fn transport_error(url: &Url, error: reqwest::Error) -> SessionError {
    if error.is_connect() || error.is_timeout() {
        SessionError::Unreachable {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else {
        SessionError::Http(error)
    }
}

/// Status, content type and full body of a resource response
pub(super) async fn fetch_response(response: reqwest::Response) -> SessionResult<FetchResponse> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?.to_vec();

    Ok(FetchResponse {
        status,
        content_type,
        body,
    })
}

#[async_trait]
impl Browser for HttpSession {
    async fn navigate(&mut self, url: &Url) -> SessionResult<NavigationResult> {
        self.ensure_open()?;
        tracing::debug!("Navigating to {}", url);
        let request = self.client.get(url.as_str());
        self.load(url, request).await
    }

    fn current_url(&self) -> Option<&Url> {
        self.page().ok().map(|page| &page.url)
    }

    async fn contains_text(&self, text: &str) -> SessionResult<bool> {
        let page = self.page()?;
        Ok(dom::contains_text(&page.html, text))
    }

    async fn query(&self, matcher: &ElementMatcher) -> SessionResult<Vec<Element>> {
        let page = self.page()?;
        dom::query(&page.html, matcher)
    }

    async fn activate(&mut self, matcher: &ElementMatcher) -> SessionResult<NavigationResult> {
        let page = self.page()?;
        let activation = dom::activation(&page.html, matcher)?;
        let page_url = page.url.clone();
        let page_status = page.status;

        let (target, request) = match activation {
            Activation::InPage => {
                tracing::debug!("Activated in-page control {}", matcher);
                return Ok(NavigationResult {
                    final_url: page_url,
                    status: page_status,
                });
            }
            Activation::Follow(href) => {
                let target = Self::resolve(&page_url, &href)?;
                tracing::debug!("Following {} -> {}", matcher, target);
                let request = self.client.get(target.as_str());
                (target, request)
            }
            Activation::Submit(form) => {
                let mut target = match form.action.as_deref() {
                    Some(action) => Self::resolve(&page_url, action)?,
                    None => page_url.clone(),
                };
                tracing::debug!("Submitting form via {} to {}", matcher, target);
                let request = match form.method {
                    FormMethod::Get => {
                        if form.fields.is_empty() {
                            target.set_query(None);
                        } else {
                            target
                                .query_pairs_mut()
                                .clear()
                                .extend_pairs(form.fields.iter());
                        }
                        self.client.get(target.as_str())
                    }
                    FormMethod::Post => self.client.post(target.as_str()).form(&form.fields),
                };
                (target, request)
            }
        };

        self.load(&target, request.header(REFERER, page_url.as_str()))
            .await
    }

    async fn fetch(&mut self, url: &Url) -> SessionResult<FetchResponse> {
        self.ensure_open()?;
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let fetched = fetch_response(response).await?;

        tracing::debug!(
            "Fetched {} (status {}, {} bytes)",
            url,
            fetched.status,
            fetched.body.len()
        );
        Ok(fetched)
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.page = None;
        self.closed = true;
        tracing::info!("Browser session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::SessionConfig;

    #[tokio::test]
    async fn test_queries_require_a_page() {
        let session = SessionConfig::default().launch().unwrap();
        let result = session.query(&ElementMatcher::css("a")).await;
        assert!(matches!(result, Err(SessionError::NoPage)));
    }

    #[tokio::test]
    async fn test_closed_session_rejects_calls() {
        let mut session = SessionConfig::default().launch().unwrap();
        session.close().await.unwrap();

        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        assert!(matches!(session.navigate(&url).await, Err(SessionError::Closed)));
        assert!(matches!(session.fetch(&url).await, Err(SessionError::Closed)));
        assert!(matches!(session.close().await, Err(SessionError::Closed)));
        assert!(session.current_url().is_none());
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let mut session = SessionConfig::default()
            .with_timeouts(std::time::Duration::from_secs(2), std::time::Duration::from_secs(1))
            .launch()
            .unwrap();

        // Port 9 (discard) is closed on test hosts
        let url = Url::parse("http://127.0.0.1:9/listing").unwrap();
        let result = session.navigate(&url).await;
        assert!(matches!(result, Err(SessionError::Unreachable { .. })));
        assert!(session.current_url().is_none());
    }

    #[test]
    fn test_resolve_relative_href() {
        let base = Url::parse("https://example.gov/listing/data-set-9-files?page=1").unwrap();
        let next = HttpSession::resolve(&base, "?page=2").unwrap();
        assert_eq!(
            next.as_str(),
            "https://example.gov/listing/data-set-9-files?page=2"
        );
    }
}
