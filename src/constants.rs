//! Application constants for Disclosure Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Default listing sources walked when no configuration overrides them
pub mod listings {
    /// DOJ disclosure data set listings
    pub const DEFAULT_LISTING_URLS: &[&str] = &[
        "https://www.justice.gov/epstein/doj-disclosures/data-set-9-files",
        "https://www.justice.gov/epstein/doj-disclosures/data-set-10-files",
        "https://www.justice.gov/epstein/doj-disclosures/data-set-11-files",
    ];

    /// Label used when a listing URL has no usable path segment
    pub const FALLBACK_LABEL: &str = "listing";
}

/// HTTP session configuration constants
pub mod http {
    use super::Duration;

    /// Desktop browser user agent; the listing host rejects obvious bots
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    /// Accept-Language header sent with every request
    pub const LOCALE: &str = "en-US";

    /// Default HTTP request timeout (document bodies can be large)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;

    /// Environment variable naming the Chromium executable
    pub const CHROMIUM_PATH_ENV: &str = "DISCLOSURE_FETCHER_CHROMIUM";

    /// Executables looked up on PATH when no Chromium path is configured
    pub const CHROMIUM_BINARIES: &[&str] = &["chromium", "chromium-browser", "google-chrome"];

    /// Pause between a click and waiting for the navigation it may start
    pub const CLICK_GRACE: Duration = Duration::from_millis(250);

    /// Poll interval while waiting for a rendered page to finish loading
    pub const SETTLE_POLL: Duration = Duration::from_millis(100);
}

/// Page walking behaviour
pub mod walker {
    use super::Duration;

    /// Pause before activating a "next" control
    pub const PAGE_DELAY: Duration = Duration::from_millis(1200);

    /// Pause after the consent gate has been dismissed
    pub const GATE_SETTLE_DELAY: Duration = Duration::from_millis(4000);

    /// Visible text of the age/consent interstitial
    pub const CONSENT_PROMPT_TEXT: &str = "Are you 18 years of age or older?";

    /// Visible text of the affirmative consent control
    pub const CONSENT_AFFIRMATIVE_TEXT: &str = "Yes";

    /// Selectors tried, in order, for the affirmative consent control
    pub const CONSENT_SELECTORS: &[&str] = &["a", "button", "[role='button']"];

    /// Listing-specific pager control
    pub const NEXT_PAGER_SELECTOR: &str = "li.pager__item--next a";

    /// Generic relation-based "next" link
    pub const NEXT_REL_SELECTOR: &str = "a[rel='next']";

    /// Visible text of a plain "next" link
    pub const NEXT_TEXT: &str = "Next";

    /// Links carrying a pagination query; plain "Next" links must match it
    pub const PAGE_QUERY_LINK_SELECTOR: &str = "a[href*='?page=']";

    /// Selector used to enumerate candidate document links
    pub const ANCHOR_SELECTOR: &str = "a[href]";
}

/// Document format accepted by the downloader
pub mod documents {
    /// Canonical document extension (without dot)
    pub const EXTENSION: &str = "pdf";

    /// Known single-character typo variants of the extension
    pub const TYPO_EXTENSIONS: &[&str] = &["ppdf"];

    /// Leading bytes every valid document starts with
    pub const SIGNATURE: &[u8] = b"%PDF";

    /// File name used when a URL has no final path segment
    pub const FALLBACK_FILE_NAME: &str = "download.pdf";
}

/// File operation constants
pub mod files {
    /// Staging file suffix for atomic writes
    pub const STAGING_SUFFIX: &str = ".part";

    /// Default output directory (relative to the working directory)
    pub const DEFAULT_OUTPUT_DIR: &str = "disclosure_documents";

    /// Default file for visited page URLs written by `walk`
    pub const DEFAULT_PAGES_FILE: &str = "valid_page_urls.txt";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "disclosure-fetcher.toml";

    /// Directory under the user config dir holding `config.toml`
    pub const CONFIG_DIR_NAME: &str = "disclosure-fetcher";
}

/// Logging and debugging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Target used for the crate-level filter directive
    pub const CRATE_TARGET: &str = "disclosure_fetcher";
}

// Re-export commonly used constants for convenience
pub use files::{DEFAULT_OUTPUT_DIR, STAGING_SUFFIX};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use listings::DEFAULT_LISTING_URLS;
