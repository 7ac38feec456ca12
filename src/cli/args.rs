//! Command-line argument parsing for Disclosure Fetcher
//!
//! This module defines the CLI structure using clap derive macros: a full
//! `fetch` run, a discovery-only `walk`, and configuration management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::constants::files;

/// Disclosure Fetcher - Download documents from gated, paginated listings
#[derive(Parser, Debug)]
#[command(
    name = "disclosure_fetcher",
    version,
    about = "Download the documents linked from paginated disclosure listings",
    long_about = "Walks each listing through its age/consent gate and every page of its pagination,
collects the linked PDF documents, and downloads them into one flat directory.
Re-running the tool only fetches what is still missing."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory for downloaded documents
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk every listing and download its documents
    Fetch(FetchArgs),

    /// Walk every listing and record what was found, without downloading
    Walk(WalkArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Listing URL to walk instead of the configured ones (repeatable)
    #[arg(short, long = "listing", value_name = "URL")]
    pub listings: Vec<String>,

    /// Download from the pages recorded by `walk` instead of walking listings
    #[arg(long, value_name = "FILE", conflicts_with = "listings")]
    pub pages_file: Option<PathBuf>,

    /// Write a JSON run report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Disable the download progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the walk command
#[derive(Args, Debug, Clone)]
pub struct WalkArgs {
    /// Listing URL to walk instead of the configured ones (repeatable)
    #[arg(short, long = "listing", value_name = "URL")]
    pub listings: Vec<String>,

    /// File receiving every visited page URL, one per line
    #[arg(long, value_name = "FILE", default_value = files::DEFAULT_PAGES_FILE)]
    pub pages_file: PathBuf,

    /// File receiving every document URL, one per line
    #[arg(long, value_name = "FILE")]
    pub documents_file: Option<PathBuf>,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_with_repeated_listings() {
        let cli = Cli::try_parse_from([
            "disclosure_fetcher",
            "--output-dir",
            "docs",
            "fetch",
            "--listing",
            "https://example.gov/a",
            "-l",
            "https://example.gov/b",
            "--report",
            "run.json",
        ])
        .unwrap();

        assert_eq!(cli.global.output_dir, Some(PathBuf::from("docs")));
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.listings.len(), 2);
                assert_eq!(args.report, Some(PathBuf::from("run.json")));
                assert!(!args.no_progress);
            }
            other => panic!("Expected fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_from_recorded_pages() {
        let cli = Cli::try_parse_from([
            "disclosure_fetcher",
            "fetch",
            "--pages-file",
            "valid_page_urls.txt",
        ])
        .unwrap();
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.pages_file, Some(PathBuf::from("valid_page_urls.txt")));
            }
            other => panic!("Expected fetch, got {:?}", other),
        }

        let conflicting = Cli::try_parse_from([
            "disclosure_fetcher",
            "fetch",
            "--pages-file",
            "valid_page_urls.txt",
            "--listing",
            "https://example.gov/a",
        ]);
        assert!(conflicting.is_err());
    }

    #[test]
    fn test_walk_defaults_pages_file() {
        let cli = Cli::try_parse_from(["disclosure_fetcher", "walk"]).unwrap();
        match cli.command {
            Commands::Walk(args) => {
                assert_eq!(args.pages_file, PathBuf::from("valid_page_urls.txt"));
                assert!(args.documents_file.is_none());
                assert!(args.listings.is_empty());
            }
            other => panic!("Expected walk, got {:?}", other),
        }
    }

    #[test]
    fn test_log_level() {
        let quiet = Cli::try_parse_from(["disclosure_fetcher", "-q", "config", "show"]).unwrap();
        assert_eq!(quiet.log_level(), tracing::Level::ERROR);

        let verbose = Cli::try_parse_from(["disclosure_fetcher", "config", "show", "-v"]).unwrap();
        assert_eq!(verbose.log_level(), tracing::Level::INFO);

        let debug =
            Cli::try_parse_from(["disclosure_fetcher", "--very-verbose", "fetch"]).unwrap();
        assert_eq!(debug.log_level(), tracing::Level::DEBUG);

        let default = Cli::try_parse_from(["disclosure_fetcher", "fetch"]).unwrap();
        assert_eq!(default.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::try_parse_from(["disclosure_fetcher", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs {
                action: ConfigAction::Init { force: true }
            })
        ));
    }
}
