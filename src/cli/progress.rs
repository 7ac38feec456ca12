//! Console rendering of pipeline progress
//!
//! Every line printed here is plain printable ASCII: URLs and file names with
//! other characters are escaped, and the optional indicatif bar uses ASCII
//! bar characters. The bar is only shown on an interactive terminal.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::app::{AcquireOutcome, GateOutcome, ProgressEvent, ProgressSink};

/// How the console progress behaves
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOptions {
    /// Only print warnings and failures
    pub quiet: bool,
    /// Show a progress bar while downloading
    pub progress_bar: bool,
}

impl ConsoleOptions {
    /// Enable the bar only when stdout is a terminal
    pub fn detect(quiet: bool, no_progress: bool) -> Self {
        Self {
            quiet,
            progress_bar: !quiet && !no_progress && atty::is(atty::Stream::Stdout),
        }
    }
}

/// Prints progress events as console lines
pub struct ConsoleProgress {
    options: ConsoleOptions,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new(options: ConsoleOptions) -> Self {
        Self {
            options,
            bar: Mutex::new(None),
        }
    }

    /// Remove the progress bar, if any
    pub fn finish(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(bar) = bar.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn start_bar(&self, total: usize) {
        if !self.options.progress_bar || total == 0 {
            return;
        }

        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stdout());
        let style = ProgressStyle::with_template("[{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);

        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn print(&self, line: &str) {
        match self.bar.lock() {
            Ok(bar) => match bar.as_ref() {
                Some(bar) => bar.println(line),
                None => println!("{}", line),
            },
            Err(_) => println!("{}", line),
        }
    }

    fn advance(&self) {
        if let Ok(bar) = self.bar.lock() {
            if let Some(bar) = bar.as_ref() {
                bar.inc(1);
            }
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: ProgressEvent<'_>) {
        if let ProgressEvent::DownloadStarted { total } = event {
            self.start_bar(total);
        }

        if let Some(line) = render(&event) {
            if !self.options.quiet || line.starts_with("[!]") {
                self.print(&line);
            }
        }

        if let ProgressEvent::FileFinished { .. } = event {
            self.advance();
        }
    }
}

/// Console line for an event, `None` when the event prints nothing
pub fn render(event: &ProgressEvent<'_>) -> Option<String> {
    let line = match *event {
        ProgressEvent::ListingStarted { listing } => format!(
            "[*] Walking listing {}: {}",
            ascii_safe(listing.label()),
            ascii_safe(listing.url().as_str())
        ),
        ProgressEvent::ListingSkipped { listing, reason } => format!(
            "[!] Skipping listing {}: {}",
            ascii_safe(listing.label()),
            ascii_safe(&reason.to_string())
        ),
        ProgressEvent::ConsentGate { outcome, .. } => match outcome {
            GateOutcome::NotPresent => return None,
            GateOutcome::Cleared => "[*] Consent gate cleared".to_string(),
            other => format!("[!] Consent gate {}", ascii_safe(&other.to_string())),
        },
        ProgressEvent::PageScanned {
            url,
            documents_found,
            new_documents,
        } => format!(
            "    Page {}: {} document links ({} new)",
            ascii_safe(url.as_str()),
            documents_found,
            new_documents
        ),
        ProgressEvent::WalkFinished { listing, report } => format!(
            "[*] {}: {} documents on {} pages ({})",
            ascii_safe(listing.label()),
            report.documents.len(),
            report.pages.len(),
            ascii_safe(&report.termination.to_string())
        ),
        ProgressEvent::DownloadStarted { total } => {
            format!("[*] Downloading {} documents", total)
        }
        ProgressEvent::FileFinished {
            url,
            file_name,
            outcome,
        } => match outcome {
            AcquireOutcome::AlreadyPresent => format!("[OK] Exists: {}", ascii_safe(file_name)),
            AcquireOutcome::Downloaded { .. } => {
                format!("[DL] Downloaded: {}", ascii_safe(file_name))
            }
            AcquireOutcome::HttpError { status } => {
                format!("[!] HTTP {} for {}", status, ascii_safe(url.as_str()))
            }
            AcquireOutcome::NotAValidDocument { .. } => {
                format!("[!] Not a valid document: {}", ascii_safe(url.as_str()))
            }
            AcquireOutcome::FetchFailed { reason } => format!(
                "[!] Fetch failed for {}: {}",
                ascii_safe(url.as_str()),
                ascii_safe(reason)
            ),
            AcquireOutcome::FilesystemError { reason } => format!(
                "[!] Could not save {}: {}",
                ascii_safe(file_name),
                ascii_safe(reason)
            ),
        },
    };
    Some(line)
}

/// Keep printable ASCII, escape everything else as `\u{..}`
pub fn ascii_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ' ' || c.is_ascii_graphic() {
            out.push(c);
        } else {
            out.extend(c.escape_unicode());
        }
    }
    out
}
