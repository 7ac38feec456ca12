//! Configuration management for Disclosure Fetcher
//!
//! This module provides TOML configuration with multi-source loading and
//! zero-config defaults. Every section and every field is optional: a missing
//! value falls back to the built-in default, so an empty file (or no file at
//! all) walks the three default disclosure listings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::session::ElementMatcher;
use crate::app::walker::config::{default_consent_controls, default_next_controls};
use crate::app::{
    CoordinatorConfig, DocumentFormat, DownloadConfig, ListingSource, SessionConfig, SessionEngine,
    WalkerConfig,
};
use crate::constants::{files, http, listings, logging, walker};
use crate::errors::{AppError, ConfigError, ConfigResult, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listings walked in order
    pub listings: Vec<ListingToml>,
    /// Where documents are written
    pub output: OutputConfigToml,
    /// Browser session settings
    pub session: SessionConfigToml,
    /// Page walking settings
    pub walker: WalkerConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listings: listings::DEFAULT_LISTING_URLS
                .iter()
                .map(|url| ListingToml {
                    url: url.to_string(),
                    label: None,
                })
                .collect(),
            output: OutputConfigToml::default(),
            session: SessionConfigToml::default(),
            walker: WalkerConfigToml::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// One `[[listings]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingToml {
    pub url: String,
    /// Defaults to the last path segment of `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// TOML-friendly output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfigToml {
    /// Flat directory receiving every document
    pub dir: PathBuf,
}

impl Default for OutputConfigToml {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(files::DEFAULT_OUTPUT_DIR),
        }
    }
}

/// TOML-friendly session configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfigToml {
    /// "http" or "chromium" (needs the `chromium` feature)
    pub engine: SessionEngine,
    /// Chromium executable; searched for on PATH when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromium_path: Option<PathBuf>,
    pub user_agent: String,
    pub locale: String,
    /// Per-request timeout, e.g. "2m"
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout, e.g. "30s"
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for SessionConfigToml {
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

/// TOML-friendly walker configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WalkerConfigToml {
    /// Pause before each "next" activation, e.g. "1200ms"
    #[serde(with = "humantime_serde")]
    pub page_delay: Duration,
    /// Pause after dismissing the consent gate, e.g. "4s"
    #[serde(with = "humantime_serde")]
    pub gate_settle_delay: Duration,
    /// Text identifying the consent prompt
    pub consent_prompt: String,
    /// Affirmative consent controls, tried in order
    pub consent_controls: Vec<ElementMatcher>,
    /// Next-page controls, tried in order
    pub next_controls: Vec<ElementMatcher>,
}

impl Default for WalkerConfigToml {
    fn default() -> Self {
        Self {
            page_delay: walker::PAGE_DELAY,
            gate_settle_delay: walker::GATE_SETTLE_DELAY,
            consent_prompt: walker::CONSENT_PROMPT_TEXT.to_string(),
            consent_controls: default_consent_controls(),
            next_controls: default_next_controls(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Enable ANSI colors in log output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            colored_output: false,
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Explicit `--config` file (must exist)
    /// 2. `./disclosure-fetcher.toml`
    /// 3. `<user config dir>/disclosure-fetcher/config.toml`
    /// 4. Built-in defaults
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Ok(Self::load_from_file(&path).await?),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Some(user_config) = Self::default_config_path() {
            search_paths.push(user_config);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Write the default configuration file
    ///
    /// Writes to `path` when given, otherwise to the user config path. An
    /// existing file is only replaced with `force`.
    pub async fn initialize(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
        let config_path = match path.or_else(Self::default_config_path) {
            Some(path) => path,
            None => return Err(AppError::generic("Could not determine user config directory")),
        };

        if config_path.exists() && !force {
            return Err(AppError::generic(format!(
                "Configuration file already exists: {} (use --force to overwrite)",
                config_path.display()
            )));
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let content = Self::generate_default_config_content()?;
        tokio::fs::write(&config_path, content)
            .await
            .map_err(|source| ConfigError::Io {
                path: config_path.clone(),
                source,
            })?;

        info!("Wrote default configuration to {}", config_path.display());
        Ok(config_path)
    }

    /// Default configuration as commented TOML
    pub fn generate_default_config_content() -> ConfigResult<String> {
        let body = Self::default().to_toml()?;
        Ok(format!(
            "# Disclosure Fetcher configuration\n\
             # Durations accept humantime values such as \"1200ms\", \"4s\" or \"2m\".\n\
             # Matchers take a CSS `selector` and an optional visible `text`.\n\n{}",
            body
        ))
    }

    /// Render this configuration as TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply command line overrides
    ///
    /// Listings given on the command line replace the configured ones.
    pub fn apply_overrides(&mut self, listing_urls: &[String], output_dir: Option<&Path>) {
        if !listing_urls.is_empty() {
            self.listings = listing_urls
                .iter()
                .map(|url| ListingToml {
                    url: url.clone(),
                    label: None,
                })
                .collect();
        }
        if let Some(dir) = output_dir {
            self.output.dir = dir.to_path_buf();
        }
    }

    /// Validate and convert to the runtime configuration
    pub fn to_coordinator_config(&self) -> ConfigResult<CoordinatorConfig> {
        if self.listings.is_empty() {
            return Err(ConfigError::NoListings);
        }

        let listings = self
            .listings
            .iter()
            .enumerate()
            .map(|(index, listing)| {
                ListingSource::new(&listing.url, listing.label.as_deref()).map_err(|e| match e {
                    ConfigError::InvalidValue { value, reason, .. } => ConfigError::InvalidValue {
                        field: format!("listings[{}].url", index),
                        value,
                        reason,
                    },
                    other => other,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output.dir".to_string(),
                value: String::new(),
                reason: "Output directory must not be empty".to_string(),
            });
        }

        if self.session.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "session.user_agent".to_string(),
                value: self.session.user_agent.clone(),
                reason: "User agent must not be empty".to_string(),
            });
        }

        let walker = WalkerConfig {
            page_delay: self.walker.page_delay,
            gate_settle_delay: self.walker.gate_settle_delay,
            consent_prompt: self.walker.consent_prompt.clone(),
            consent_controls: self.walker.consent_controls.clone(),
            next_controls: self.walker.next_controls.clone(),
            format: DocumentFormat::pdf(),
        };
        walker.validate()?;

        Ok(CoordinatorConfig {
            listings,
            session: SessionConfig {
                engine: self.session.engine,
                chromium_path: self.session.chromium_path.clone(),
                user_agent: self.session.user_agent.clone(),
                locale: self.session.locale.clone(),
                request_timeout: self.session.request_timeout,
                connect_timeout: self.session.connect_timeout,
                max_redirects: self.session.max_redirects,
            },
            download: DownloadConfig {
                output_dir: self.output.dir.clone(),
                format: walker.format.clone(),
            },
            walker,
        })
    }
}
