//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `portchecker scan <address>...` - Scan addresses for open ports
//! - `portchecker threads` - Show the logical processor count
//! - `portchecker settings show|set|reset` - Manage saved preferences

mod scan;
mod settings;

pub use scan::ScanCommand;
pub use settings::{SettingsAction, SettingsCommand};

use crate::scanner::number_of_logical_processors;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// portchecker - A concurrent TCP port checker.
///
/// Probes every port of a range on every address given (single IPs,
/// hostnames and CIDR blocks) with a pool of workers and reports each
/// port as open, closed or unknown.
#[derive(Parser, Debug)]
#[command(name = "portchecker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A concurrent TCP port checker", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a custom settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan addresses for open ports
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Show the number of logical processors
    Threads,

    /// View and change saved settings
    Settings(SettingsCommand),
}

impl Cli {
    /// Log filter directive implied by the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "info"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Print the logical processor count.
pub fn print_threads(quiet: bool) {
    let count = number_of_logical_processors();
    if quiet {
        println!("{}", count);
    } else {
        println!("Logical processors: {}", count);
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}
