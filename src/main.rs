//! Disclosure Fetcher CLI application
//!
//! Command-line interface for downloading the documents linked from gated,
//! paginated disclosure listings.

use std::process;

use tracing::{error, info};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

use disclosure_fetcher::cli::{handle_config, handle_fetch, handle_walk, Cli, Commands};
use disclosure_fetcher::config::AppConfig;
use disclosure_fetcher::constants::logging;
use disclosure_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!(category = e.category(), "Run failed: {}", e);
        eprintln!("Error: {}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  Caused by: {}", cause);
            source = cause.source();
        }
        if e.is_recoverable() {
            eprintln!("This failure may be transient; re-running the command may succeed.");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);

    info!("Disclosure Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(args, &cli.global, config).await
        }
        Commands::Walk(args) => {
            info!("Executing walk command");
            handle_walk(args, &cli.global, config).await
        }
        Commands::Config(args) => handle_config(args, &cli.global, config).await,
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let explicit = cli.global.quiet || cli.global.verbose || cli.global.very_verbose;
    let level = if explicit {
        cli.log_level().to_string().to_lowercase()
    } else {
        config.logging.level.clone()
    };

    let directive = format!("{}={}", logging::CRATE_TARGET, level);
    let filter = match directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env().add_directive(LevelFilter::WARN.into()),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.logging.colored_output)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
