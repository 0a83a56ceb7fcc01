//! Step domain model

use crate::core::{
    condition::Conditional,
    config::StepConfig,
};
use std::path::PathBuf;

/// What a step does when it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Raw script text handed to the job's shell
    Command(String),
    /// Plugin reference whose `run` lifecycle template is executed
    Plugin(String),
}

/// A single step in a job
///
/// `Clone` is a plain field-by-field deep copy. Plugin lifecycle templates are
/// cloned before every use, so each invocation owns its `dir` and `env`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Optional display name
    pub name: Option<String>,

    /// Command body or plugin reference
    pub action: StepAction,

    /// Working directory (relative paths resolve against the run's workdir)
    pub dir: Option<PathBuf>,

    /// `KEY=VALUE` entries declared on the step
    pub env: Vec<String>,

    /// Guard list (`if`)
    pub conditions: Vec<Conditional>,

    /// Force the error state back to OK after this step runs
    pub ignore_error: bool,
}

impl Step {
    /// Create a step from a step config
    ///
    /// `use` wins over `cmd` when both are somehow present; validation
    /// rejects that combination before configs reach this point.
    pub fn from_config(config: &StepConfig) -> Self {
        let action = match (&config.uses, &config.cmd) {
            (Some(reference), _) => StepAction::Plugin(reference.clone()),
            (None, cmd) => StepAction::Command(cmd.clone().unwrap_or_default()),
        };

        Step {
            name: config.name.clone(),
            action,
            dir: config.dir.as_ref().map(PathBuf::from),
            env: config.env.clone(),
            conditions: config.conditions.iter().map(Conditional::from_config).collect(),
            ignore_error: config.ignore_error,
        }
    }

    /// Build a bare command step
    pub fn command(cmd: impl Into<String>) -> Self {
        Step {
            name: None,
            action: StepAction::Command(cmd.into()),
            dir: None,
            env: Vec::new(),
            conditions: Vec::new(),
            ignore_error: false,
        }
    }

    /// Command body, if this is a command step
    pub fn cmd(&self) -> Option<&str> {
        match &self.action {
            StepAction::Command(cmd) => Some(cmd),
            StepAction::Plugin(_) => None,
        }
    }

    /// Plugin reference, if this is a plugin-invocation step
    pub fn plugin_reference(&self) -> Option<&str> {
        match &self.action {
            StepAction::Plugin(reference) => Some(reference),
            StepAction::Command(_) => None,
        }
    }

    /// True when any guard carries the error marker
    pub fn runs_only_on_error(&self) -> bool {
        self.conditions.iter().any(|c| c.is_error)
    }

    /// Name used in progress output: the declared name, else the first
    /// command line, else the plugin reference
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.action {
            StepAction::Command(cmd) => cmd.lines().next().unwrap_or_default().trim().to_string(),
            StepAction::Plugin(reference) => format!("use {}", reference),
        }
    }
}
