//! Command-line interface components
//!
//! This module contains CLI-specific code for the Disclosure Fetcher
//! application: argument parsing, command handlers and console progress.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, ConfigAction, ConfigArgs, FetchArgs, GlobalArgs, WalkArgs};
pub use commands::{handle_config, handle_fetch, handle_walk};
pub use progress::{ConsoleOptions, ConsoleProgress};
