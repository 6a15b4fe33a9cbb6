//! CLI module for Updraft
//!
//! One positional lifecycle command selects the execution mode: `preview`
//! computes and prints a diff without applying, `destroy` tears down every
//! declared resource, and no command applies the topology. The three modes
//! are mutually exclusive and selected once per invocation.

pub mod output;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::DEFAULT_ENV_FILE;

/// Updraft - declarative Azure update-management deployment
#[derive(Parser, Debug, Clone)]
#[command(name = "updraft")]
#[command(author = "Updraft Contributors")]
#[command(version)]
#[command(about = "Declare and deploy an Azure update-management topology", long_about = None)]
pub struct Cli {
    /// Lifecycle command (omit to apply)
    #[arg(value_enum)]
    pub mode: Option<Mode>,

    /// Path to the environment file with deployment settings
    #[arg(long, default_value = DEFAULT_ENV_FILE, env = "UPDRAFT_ENV_FILE")]
    pub env_file: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Lifecycle command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Compute and print the plan without applying it
    Preview,
    /// Tear down all declared resources
    Destroy,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-4)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(4)
    }
}
