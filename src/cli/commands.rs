//! Command handlers for Disclosure Fetcher CLI
//!
//! This module implements the command handlers that connect CLI arguments and
//! configuration to the coordinator, and renders the final summaries.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::app::{
    Coordinator, DiscoveryReport, DocumentUrl, ListingOutcome, ListingSource, RunSummary,
};
use crate::cli::progress::ascii_safe;
use crate::cli::{
    ConfigAction, ConfigArgs, ConsoleOptions, ConsoleProgress, FetchArgs, GlobalArgs, WalkArgs,
};
use crate::config::AppConfig;
use crate::errors::{ConfigError, Result};

/// Handle the fetch command
///
/// Walks every listing (or scans the pages of a recorded page list), downloads
/// the merged document set and prints the summary. Per-listing and per-file
/// failures are part of the summary, not errors.
pub async fn handle_fetch(args: FetchArgs, global: &GlobalArgs, mut config: AppConfig) -> Result<()> {
    config.apply_overrides(&args.listings, global.output_dir.as_deref());
    let runtime = config.to_coordinator_config()?;
    info!(
        "Fetching from {} listings into {}",
        runtime.listings.len(),
        runtime.download.output_dir.display()
    );

    let pages = match &args.pages_file {
        Some(path) => Some(read_page_list(path).await?),
        None => None,
    };

    let console = ConsoleProgress::new(ConsoleOptions::detect(global.quiet, args.no_progress));
    let coordinator = Coordinator::new(runtime);
    let result = match &pages {
        Some(pages) => coordinator.execute_pages(pages, &console).await,
        None => coordinator.execute(&console).await,
    };
    console.finish();
    let summary = result?;

    for line in summary_lines(&summary) {
        println!("{}", line);
    }

    if let Some(path) = &args.report {
        write_report(path, &summary).await?;
        println!("Report: {}", ascii_safe(&path.display().to_string()));
    }

    Ok(())
}

/// Handle the walk command
///
/// Discovery only: nothing is downloaded. Visited pages (and optionally the
/// document URLs) are written sorted, one per line.
pub async fn handle_walk(args: WalkArgs, global: &GlobalArgs, mut config: AppConfig) -> Result<()> {
    config.apply_overrides(&args.listings, global.output_dir.as_deref());
    let runtime = config.to_coordinator_config()?;

    let console = ConsoleProgress::new(ConsoleOptions::detect(global.quiet, true));
    let coordinator = Coordinator::new(runtime);
    let discovery = coordinator.execute_discovery(&console).await?;

    let pages = write_url_list(&args.pages_file, discovery.pages()).await?;
    println!(
        "[Done] {} pages written to {}",
        pages,
        ascii_safe(&args.pages_file.display().to_string())
    );

    if let Some(path) = &args.documents_file {
        let urls = discovery.documents.sorted().into_iter().map(DocumentUrl::as_str);
        let documents = write_url_list(path, urls).await?;
        println!(
            "[Done] {} document URLs written to {}",
            documents,
            ascii_safe(&path.display().to_string())
        );
    } else {
        println!("[Done] {} unique document URLs found", discovery.documents.len());
    }

    print_skipped(&discovery);
    Ok(())
}

/// Handle configuration commands
pub async fn handle_config(args: ConfigArgs, global: &GlobalArgs, mut config: AppConfig) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            config.apply_overrides(&[], global.output_dir.as_deref());
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            let path = AppConfig::initialize(global.config.clone(), force).await?;
            println!(
                "Created configuration file: {}",
                ascii_safe(&path.display().to_string())
            );
        }
    }
    Ok(())
}

/// Final summary of a fetch run
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let downloads = &summary.downloads;
    let discovery = &summary.discovery;

    let mut lines = vec![
        String::new(),
        format!(
            "[Done] Downloaded (or already existed): {}/{}",
            downloads.succeeded(),
            downloads.total()
        ),
        format!(
            "  New: {}  Existing: {}  Failed: {}",
            downloads.downloaded(),
            downloads.already_present(),
            downloads.failed()
        ),
        format!(
            "  Listings: {} walked, {} skipped",
            discovery.listings.len() - discovery.skipped_listings(),
            discovery.skipped_listings()
        ),
        format!(
            "  Elapsed: {:.1}s",
            summary.duration().num_milliseconds() as f64 / 1000.0
        ),
    ];

    lines.push(format!(
        "Saved to: {}",
        ascii_safe(&downloads.output_dir.display().to_string())
    ));
    lines
}

fn print_skipped(discovery: &DiscoveryReport) {
    for listing in &discovery.listings {
        if let ListingOutcome::Skipped { reason } = &listing.outcome {
            println!(
                "[!] Skipped {}: {}",
                ascii_safe(&listing.label),
                ascii_safe(&reason.to_string())
            );
        }
    }
}

/// Read a page list written by the walk command
pub async fn read_page_list(path: &Path) -> Result<Vec<ListingSource>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let pages = parse_page_list(&content);
    if pages.is_empty() {
        return Err(ConfigError::NoListings.into());
    }
    info!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

/// One page URL per line; blank lines and `#` comments are ignored
pub fn parse_page_list(content: &str) -> Vec<ListingSource> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(*line))
        .filter_map(|line| match ListingSource::new(line, Some(line)) {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Ignoring page list entry: {}", e);
                None
            }
        })
        .collect()
}

/// Write URLs sorted and deduplicated, one per line; returns the count
pub async fn write_url_list<'a>(
    path: &Path,
    urls: impl IntoIterator<Item = &'a str>,
) -> Result<usize> {
    let mut urls: Vec<&str> = urls.into_iter().collect();
    urls.sort_unstable();
    urls.dedup();

    let mut content = urls.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    ensure_parent(path).await?;
    tokio::fs::write(path, content).await?;
    Ok(urls.len())
}

async fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    ensure_parent(path).await?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
