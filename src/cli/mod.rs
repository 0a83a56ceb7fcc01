//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Run build jobs declared in a YAML file
#[derive(Debug, Parser, Clone)]
#[command(name = "lscbuild")]
#[command(version)]
#[command(about = "Run shell-command build jobs declared in YAML", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run all jobs, or the ones given with --job
    Run(RunCommand),

    /// Validate a build configuration
    Validate(ValidateCommand),

    /// List declared jobs
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
