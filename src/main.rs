use anyhow::{Context, Result};
use lscbuild::cli::commands::{ListCommand, RunCommand, ValidateCommand};
use lscbuild::cli::output::*;
use lscbuild::cli::{Cli, Command};
use lscbuild::core::config::BuildConfig;
use lscbuild::execution::{EngineConfig, ExecutionEngine};
use lscbuild::plugin::GitCliSource;
use std::path::Path;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Environment variable that turns on debug output like `--verbose`
const DEBUG_VAR: &str = "LSCBUILD_DEBUG";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();
    let debug = cli.verbose || debug_from_env();

    // Initialize logging
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_jobs(cmd, debug).await,
        Command::Validate(cmd) => validate_config(cmd),
        Command::List(cmd) => list_jobs(cmd),
    }
}

fn debug_from_env() -> bool {
    std::env::var(DEBUG_VAR)
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false)
}

fn load_config(path: &Path) -> BuildConfig {
    match BuildConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} yaml parse error: {:#}", PREFIX, e);
            std::process::exit(1);
        }
    }
}

/// Entries of the global env file, in file order
fn load_global_env(path: &Path) -> Result<Vec<String>> {
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("Failed to read env file {}", path.display()))?;
    let mut env = Vec::new();
    for entry in entries {
        let (key, value) =
            entry.with_context(|| format!("Failed to parse env file {}", path.display()))?;
        env.push(format!("{}={}", key, value));
    }
    Ok(env)
}

async fn run_jobs(cmd: &RunCommand, debug: bool) -> Result<()> {
    let config = load_config(&cmd.yaml);

    let global_env = match &cmd.env {
        Some(path) => load_global_env(path)?,
        None => Vec::new(),
    };
    debug!("Global env: {:?}", global_env);

    let engine_config = EngineConfig::from_current_dir()
        .context("Failed to resolve working directory")?
        .with_debug(debug)
        .with_global_env(global_env);

    let mut engine = ExecutionEngine::new(config.to_workflow(), engine_config, GitCliSource::default());
    engine.add_event_handler(|event| {
        eprintln!("{}", format_execution_event(event));
    });

    match engine.run(&cmd.job).await {
        Ok(summary) => {
            if debug {
                eprintln!("{}", format_run_summary(&summary));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} job execute error: {}", PREFIX, e);
            std::process::exit(1);
        }
    }
}

fn validate_config(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating {}...", INFO, cmd.yaml.display());

    match BuildConfig::from_file(&cmd.yaml) {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  Version: {}", style(config.version).cyan());
            println!("  Jobs: {}", style(config.jobs.len()).cyan());
            for (name, job) in &config.jobs {
                println!("    {} ({} steps)", style(name).bold(), job.steps.len());
            }
            if let Some(plugin) = &config.plugin {
                let lifecycle: Vec<&str> = plugin.lifecycle.templates().map(|(name, _)| name).collect();
                println!("  Plugin lifecycle: {}", style(lifecycle.join(", ")).cyan());
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

fn list_jobs(cmd: &ListCommand) -> Result<()> {
    let config = load_config(&cmd.yaml);

    if config.jobs.is_empty() {
        println!("{} No jobs declared in {}", INFO, cmd.yaml.display());
        return Ok(());
    }

    for name in config.jobs.keys() {
        println!("{}", name);
    }
    Ok(())
}
