//! CLI command definitions

use crate::core::config::DEFAULT_CONFIG_FILE;
use clap::Args;
use std::path::PathBuf;

/// Run jobs
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to the build YAML file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub yaml: PathBuf,

    /// Jobs to run, in order (comma separated or repeated)
    #[arg(short, long, value_delimiter = ',')]
    pub job: Vec<String>,

    /// KEY=VALUE file applied to every step after job and step env
    #[arg(short, long)]
    pub env: Option<PathBuf>,
}

/// Validate a build configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the build YAML file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub yaml: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List declared jobs
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Path to the build YAML file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub yaml: PathBuf,
}
