//! Error types for Disclosure Fetcher
//!
//! This module defines the error types for all components of the application.
//! Only session launch and configuration errors abort a run; everything that
//! happens while walking listings or downloading documents is folded into a
//! per-listing or per-file outcome by the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Browser session errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session could not be created at all
    #[error("Failed to launch browser session")]
    Launch(#[source] reqwest::Error),

    /// HTTP request failed during navigation or fetch
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The host could not be reached or did not answer in time
    #[error("Cannot reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// A URL could not be parsed or resolved
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// CSS selector could not be parsed
    #[error("Invalid CSS selector: {selector}")]
    InvalidSelector { selector: String },

    /// An element query ran before any page was loaded
    #[error("No page is loaded in the session")]
    NoPage,

    /// Expected element not found
    #[error("Expected element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Matched element has no navigation behaviour this engine can perform
    #[error("Element <{tag}> matched by {selector} cannot be activated")]
    NotActivatable { selector: String, tag: String },

    /// The configured engine is not part of this build
    #[error("Browser engine '{engine}' is not available in this build (enable the '{engine}' feature)")]
    EngineUnavailable { engine: String },

    /// The rendering engine failed
    #[error("Browser engine error: {reason}")]
    Engine { reason: String },

    /// The session was already closed
    #[error("Browser session is closed")]
    Closed,
}

/// Document download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Output directory could not be created
    #[error("Cannot create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging file could not be written
    #[error("Failed to write staging file {path}")]
    StagingWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read or written
    #[error("Configuration file I/O failed: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML
    #[error("Failed to render configuration")]
    Render(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// No listing sources configured
    #[error("No listing sources configured")]
    NoListings,
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Report serialization error
    #[error("Failed to serialize run report")]
    Report(#[from] serde_json::Error),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if re-running the same command may succeed without changes
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Session(SessionError::Http(_))
            | AppError::Session(SessionError::Unreachable { .. })
            | AppError::Io(_) => true,

            AppError::Session(SessionError::Launch(_))
            | AppError::Config(_)
            | AppError::Report(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Session(_) => "session",
            AppError::Config(_) => "config",
            AppError::Report(_) => "report",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Session result type alias
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
