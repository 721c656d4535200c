//! Command-line argument parsing for capaudit
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// capaudit - Audit the capability surface of an executor environment
#[derive(Parser, Debug)]
#[command(name = "capaudit")]
#[command(version = "0.1.0")]
#[command(about = "Audit the capability surface of a scripting-engine executor", long_about = None)]
pub struct Args {
    /// Restrict the audit or listing to one or more categories
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Audit a JSON namespace snapshot instead of the simulated executor
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Seed for the simulated executor
    #[arg(long, conflicts_with = "snapshot")]
    pub seed: Option<u64>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress live probe lines, print only the final report)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the audit (the default when no subcommand is given)
    Run,

    /// Print the probe catalog
    List,

    /// Write the simulated executor's namespace as a JSON snapshot
    Snapshot {
        /// Output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if live probe lines should reach stdout
    pub fn show_live(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if live lines should carry per-probe wall time
    pub fn show_timing(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Check if run diagnostics should go to stderr
    pub fn show_diagnostics(&self) -> bool {
        matches!(self, Verbosity::VeryVerbose)
    }
}
