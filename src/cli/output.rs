//! CLI output formatting

use crate::{
    core::{JobStatus, RunSummary, StepState},
    execution::ExecutionEvent,
};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "+ ");

/// Prefix of every line the tool prints about itself
pub const PREFIX: &str = "[lscbuild]";

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Failed { ignored: true, .. } => style("FAILED (ignored)").yellow().to_string(),
        StepState::Failed { .. } => style("FAILED").red().to_string(),
        StepState::Skipped { reason } => style(format!("SKIPPED ({})", reason)).dim().to_string(),
    }
}

/// Format a job status for display
pub fn format_status(status: JobStatus) -> String {
    match status {
        JobStatus::Completed => style("COMPLETED").green().to_string(),
        JobStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted { execution_id, jobs } => format!(
            "{} {} Starting run {} ({})",
            PREFIX,
            ROCKET,
            style(&execution_id.to_string()[..8]).dim(),
            style(jobs.join(", ")).bold()
        ),
        ExecutionEvent::JobStarted { job } => {
            format!("{} {} job {}", PREFIX, ROCKET, style(job).bold())
        }
        ExecutionEvent::PluginFetching { plugin } => {
            format!("{} {} fetching plugin {}", PREFIX, PACKAGE, style(plugin).cyan())
        }
        ExecutionEvent::PluginInitializing { job, plugin } => format!(
            "{} {} {}: initializing plugin {}",
            PREFIX,
            PACKAGE,
            style(job).dim(),
            style(plugin).cyan()
        ),
        ExecutionEvent::StepStarted { job, step, command } => {
            let line = format!("{} {} {}: {}", PREFIX, SPINNER, style(job).dim(), style(step).cyan());
            match command {
                Some(command) if command.trim() != step.as_str() => {
                    let shown: Vec<String> = command
                        .lines()
                        .map(|l| format!("    {}", style(l).dim()))
                        .collect();
                    format!("{}\n{}", line, shown.join("\n"))
                }
                _ => line,
            }
        }
        ExecutionEvent::StepSkipped { job, step, reason } => format!(
            "{} {} {}: {} ({})",
            PREFIX,
            SKIP,
            style(job).dim(),
            style(step).dim(),
            reason
        ),
        ExecutionEvent::StepCompleted { job, step } => format!(
            "{} {} {}: {}",
            PREFIX,
            CHECK,
            style(job).dim(),
            style(step).green()
        ),
        ExecutionEvent::StepFailed {
            job,
            step,
            error,
            ignored,
        } => {
            if *ignored {
                format!(
                    "{} {} {}: {} failed, ignored: {}",
                    PREFIX,
                    WARN,
                    style(job).dim(),
                    style(step).yellow(),
                    style(error).dim()
                )
            } else {
                format!(
                    "{} {} {}: {}: {}",
                    PREFIX,
                    CROSS,
                    style(job).dim(),
                    style(step).red(),
                    style(error).dim()
                )
            }
        }
        ExecutionEvent::PluginFinalizing { job, plugin } => format!(
            "{} {} {}: finalizing plugin {}",
            PREFIX,
            PACKAGE,
            style(job).dim(),
            style(plugin).cyan()
        ),
        ExecutionEvent::PluginRemoved { plugin } => {
            format!("{} {} removed plugin {}", PREFIX, INFO, style(plugin).dim())
        }
        ExecutionEvent::JobCompleted { job, status, error } => match error {
            Some(error) => format!(
                "{} {} job {} {}: {}",
                PREFIX,
                CROSS,
                style(job).bold(),
                format_status(*status),
                style(error).dim()
            ),
            None => format!(
                "{} {} job {} {}",
                PREFIX,
                CHECK,
                style(job).bold(),
                format_status(*status)
            ),
        },
        ExecutionEvent::RunCompleted {
            execution_id,
            success,
        } => {
            let status = if *success {
                format!("{} completed", style("successfully").green())
            } else {
                style("failed").red().to_string()
            };
            format!(
                "{} {} Run ({}) {}",
                PREFIX,
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                status
            )
        }
    }
}

/// One line per job and step of a finished run
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut lines = Vec::new();
    for job in &summary.jobs {
        lines.push(format!("  {} {}", style(&job.name).bold(), format_status(job.status)));
        for step in &job.steps {
            lines.push(format!("    {} {}", step.name, format_step_state(&step.state)));
        }
    }
    lines.join("\n")
}
