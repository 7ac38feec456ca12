//! Document acquisition
//!
//! [`DownloadManager`] fetches every collected document through the browser
//! session, so cookies set while passing the consent gate are attached to each
//! request. Files land in a flat output directory named after the last URL
//! path segment and are written with a staging file plus an atomic rename:
//! an interrupted download never leaves a truncated file under the final name.
//!
//! Acquisition is idempotent. A non-empty file already present under the
//! target name is kept and counted as a success without a request; a
//! zero-byte file is treated as missing and downloaded again.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::app::models::{DocumentFormat, DocumentSet, DocumentUrl};
use crate::app::progress::{ProgressEvent, ProgressSink};
use crate::app::session::Browser;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// Where and what to download
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Flat directory receiving every document
    pub output_dir: PathBuf,
    /// Signature every body must start with
    pub format: DocumentFormat,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(files::DEFAULT_OUTPUT_DIR),
            format: DocumentFormat::pdf(),
        }
    }
}

impl DownloadConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }
}

/// Final outcome for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AcquireOutcome {
    /// A non-empty file was already present; nothing was requested
    AlreadyPresent,
    /// Fetched, validated and written
    Downloaded { bytes: u64 },
    /// The server answered with a non-success status
    HttpError { status: u16 },
    /// The body did not start with the document signature
    NotAValidDocument { content_type: Option<String> },
    /// The fetch itself failed (timeout, connection reset, closed session)
    FetchFailed { reason: String },
    /// Writing or renaming the file failed
    FilesystemError { reason: String },
}

impl AcquireOutcome {
    /// `AlreadyPresent` and `Downloaded` both count as acquired
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            AcquireOutcome::AlreadyPresent | AcquireOutcome::Downloaded { .. }
        )
    }
}

impl fmt::Display for AcquireOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireOutcome::AlreadyPresent => f.write_str("already present"),
            AcquireOutcome::Downloaded { bytes } => write!(f, "downloaded ({} bytes)", bytes),
            AcquireOutcome::HttpError { status } => write!(f, "HTTP {}", status),
            AcquireOutcome::NotAValidDocument { content_type } => match content_type {
                Some(content_type) => write!(f, "not a valid document ({})", content_type),
                None => f.write_str("not a valid document"),
            },
            AcquireOutcome::FetchFailed { reason } => write!(f, "fetch failed: {}", reason),
            AcquireOutcome::FilesystemError { reason } => write!(f, "filesystem error: {}", reason),
        }
    }
}

/// Outcome for one document, with the file it maps to
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub url: DocumentUrl,
    pub file_name: String,
    pub outcome: AcquireOutcome,
}

/// Everything an acquisition pass produced, in processing order
#[derive(Debug, Clone, Default, Serialize)]
pub struct AcquireReport {
    pub output_dir: PathBuf,
    pub files: Vec<FileReport>,
}

impl AcquireReport {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// Files that exist in the output directory after the pass
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_success()).count()
    }

    pub fn downloaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, AcquireOutcome::Downloaded { .. }))
    }

    pub fn already_present(&self) -> usize {
        self.count(|outcome| matches!(outcome, AcquireOutcome::AlreadyPresent))
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.files
            .iter()
            .map(|f| match f.outcome {
                AcquireOutcome::Downloaded { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, predicate: impl Fn(&AcquireOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.outcome)).count()
    }
}

/// Downloads documents into the output directory
pub struct DownloadManager<'a> {
    config: &'a DownloadConfig,
    progress: &'a dyn ProgressSink,
}

impl<'a> DownloadManager<'a> {
    pub fn new(config: &'a DownloadConfig, progress: &'a dyn ProgressSink) -> Self {
        Self { config, progress }
    }

    /// Acquire every URL, one at a time, in lexicographic order
    ///
    /// Per-file failures are reported and processing continues. When the
    /// output directory cannot be created, every file is reported as a
    /// filesystem error and nothing is fetched.
    pub async fn acquire<B>(&self, documents: &DocumentSet, session: &mut B) -> AcquireReport
    where
        B: Browser + ?Sized,
    {
        let output_dir = &self.config.output_dir;
        let unusable_dir = match fs::create_dir_all(output_dir).await {
            Ok(()) => None,
            Err(source) => {
                let e = DownloadError::OutputDirectory {
                    path: output_dir.clone(),
                    source,
                };
                error!("{}", e);
                Some(e.to_string())
            }
        };

        let urls = documents.sorted();
        info!(
            "Acquiring {} documents into {}",
            urls.len(),
            output_dir.display()
        );
        self.progress.emit(ProgressEvent::DownloadStarted { total: urls.len() });

        let mut report = AcquireReport {
            output_dir: output_dir.clone(),
            files: Vec::with_capacity(urls.len()),
        };

        for url in urls {
            let file_name = url.file_name();
            let outcome = match &unusable_dir {
                Some(reason) => AcquireOutcome::FilesystemError {
                    reason: reason.clone(),
                },
                None => self.acquire_one(url, &file_name, session).await,
            };

            self.progress.emit(ProgressEvent::FileFinished {
                url,
                file_name: &file_name,
                outcome: &outcome,
            });

            report.files.push(FileReport {
                url: url.clone(),
                file_name,
                outcome,
            });
        }

        info!(
            "Acquired {}/{} documents ({} downloaded, {} already present)",
            report.succeeded(),
            report.total(),
            report.downloaded(),
            report.already_present()
        );
        report
    }

    /// Acquire a single document
    async fn acquire_one<B>(&self, url: &DocumentUrl, file_name: &str, session: &mut B) -> AcquireOutcome
    where
        B: Browser + ?Sized,
    {
        let final_path = self.config.output_dir.join(file_name);

        if Self::is_present(&final_path).await {
            debug!("Already present: {}", final_path.display());
            return AcquireOutcome::AlreadyPresent;
        }

        let response = match session.fetch(url.url()).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                return AcquireOutcome::FetchFailed {
                    reason: e.to_string(),
                };
            }
        };

        if !response.is_success() {
            warn!("HTTP {} for {}", response.status, url);
            return AcquireOutcome::HttpError {
                status: response.status,
            };
        }

        if !self.config.format.matches_signature(&response.body) {
            warn!(
                "Not a valid document: {} (content type {:?})",
                url, response.content_type
            );
            return AcquireOutcome::NotAValidDocument {
                content_type: response.content_type,
            };
        }

        match Self::write_atomic(&final_path, &response.body).await {
            Ok(()) => {
                debug!("Saved {} ({} bytes)", final_path.display(), response.body.len());
                AcquireOutcome::Downloaded {
                    bytes: response.body.len() as u64,
                }
            }
            Err(e) => {
                error!("Failed to save {}: {}", final_path.display(), e);
                AcquireOutcome::FilesystemError {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// A file counts as present only when it is non-empty
    async fn is_present(path: &Path) -> bool {
        match fs::metadata(path).await {
            Ok(metadata) => metadata.is_file() && metadata.len() > 0,
            Err(_) => false,
        }
    }

    /// `<final>.part` sibling used while writing
    pub fn staging_path(final_path: &Path) -> PathBuf {
        let mut staging = final_path.as_os_str().to_os_string();
        staging.push(files::STAGING_SUFFIX);
        PathBuf::from(staging)
    }

    /// Write `content` to a staging file, flush it, then rename it into place
    ///
    /// A leftover staging file from an interrupted run is overwritten. On any
    /// failure the staging file is removed and the final path is untouched.
    async fn write_atomic(final_path: &Path, content: &[u8]) -> DownloadResult<()> {
        let staging = Self::staging_path(final_path);

        if let Err(source) = Self::write_staging(&staging, content).await {
            let _ = fs::remove_file(&staging).await;
            return Err(DownloadError::StagingWrite {
                path: staging,
                source,
            });
        }

        if let Err(source) = fs::rename(&staging, final_path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(DownloadError::AtomicOperationFailed {
                temp_path: staging,
                final_path: final_path.to_path_buf(),
                source,
            });
        }

        Ok(())
    }

    async fn write_staging(staging: &Path, content: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(staging).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        Ok(())
    }
}
