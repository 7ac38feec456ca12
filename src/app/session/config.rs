//! Session configuration and launch
//!
//! This module handles the configuration and construction of the HTTP client
//! that backs a browser session, and the choice of rendering engine.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};

use super::{Browser, HttpSession};
use crate::constants::http;
use crate::errors::{SessionError, SessionResult};

/// Which engine renders listing pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEngine {
    /// Cookie-keeping HTTP client; no scripts
    #[default]
    Http,
    /// Headless Chromium; needs the `chromium` feature
    Chromium,
}

impl fmt::Display for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEngine::Http => f.write_str("http"),
            SessionEngine::Chromium => f.write_str("chromium"),
        }
    }
}

/// Configuration for a browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Rendering engine
    pub engine: SessionEngine,
    /// Chromium executable; searched for when unset
    pub chromium_path: Option<PathBuf>,
    /// User agent presented to the listing host
    pub user_agent: String,
    /// Value of the Accept-Language header
    pub locale: String,
    /// Request timeout (applies to navigations and document fetches)
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Maximum redirects followed per request
    pub max_redirects: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: SessionEngine::default(),
            chromium_path: None,
            user_agent: http::USER_AGENT.to_string(),
            locale: http::LOCALE.to_string(),
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            max_redirects: http::MAX_REDIRECTS,
        }
    }
}

impl SessionConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> SessionResult<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        if let Ok(locale) = HeaderValue::from_str(&self.locale) {
            headers.insert(ACCEPT_LANGUAGE, locale);
        }

        Client::builder()
            .cookie_store(true) // Consent cookies must survive across requests
            .default_headers(headers)
            .user_agent(self.user_agent.as_str())
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(redirect::Policy::limited(self.max_redirects))
            .build()
            .map_err(SessionError::Launch)
    }

    /// Launch a new session
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Launch` if the HTTP client cannot be built. This
    /// is the only fatal failure of a run.
    pub fn launch(&self) -> SessionResult<HttpSession> {
        let client = self.build_http_client()?;
        tracing::info!(
            "Launched browser session (user agent: {}, timeout: {:?})",
            self.user_agent,
            self.request_timeout
        );
        Ok(HttpSession::new(client))
    }

    /// Launch a session on the configured engine
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EngineUnavailable` when Chromium is configured
    /// but the crate was built without the `chromium` feature, or the engine's
    /// launch error.
    pub async fn open(&self) -> SessionResult<Box<dyn Browser>> {
        match self.engine {
            SessionEngine::Http => Ok(Box::new(self.launch()?)),
            #[cfg(feature = "chromium")]
            SessionEngine::Chromium => Ok(Box::new(
                super::chromium::ChromiumSession::launch(self).await?,
            )),
            #[cfg(not(feature = "chromium"))]
            SessionEngine::Chromium => Err(SessionError::EngineUnavailable {
                engine: SessionEngine::Chromium.to_string(),
            }),
        }
    }

    /// Session configuration with short timeouts for local test servers
    pub fn with_timeouts(mut self, request: Duration, connect: Duration) -> Self {
        self.request_timeout = request;
        self.connect_timeout = connect;
        self
    }
}
