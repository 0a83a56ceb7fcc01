//! Job and workflow domain models

use crate::core::{
    config::{BuildConfig, JobConfig},
    shell::Shell,
    step::Step,
};

/// A named, ordered collection of steps sharing a shell and base environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub steps: Vec<Step>,

    /// Declared shell; the platform shell is used when absent
    pub shell: Option<Shell>,

    /// `KEY=VALUE` entries applied to every step
    pub env: Vec<String>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            shell: None,
            env: Vec::new(),
        }
    }

    pub fn from_config(name: &str, config: &JobConfig) -> Self {
        Self {
            name: name.to_string(),
            steps: config.steps.iter().map(Step::from_config).collect(),
            shell: config.shell.as_deref().and_then(Shell::parse),
            env: config.env.clone(),
        }
    }

    /// Effective shell
    pub fn shell(&self) -> Shell {
        self.shell.clone().unwrap_or_else(Shell::platform_default)
    }

    /// Plugin references used by the steps, first use first, without duplicates
    pub fn plugin_references(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for reference in self.steps.iter().filter_map(Step::plugin_reference) {
            if !seen.contains(&reference) {
                seen.push(reference);
            }
        }
        seen
    }
}

/// All jobs of a configuration, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    jobs: Vec<Job>,
}

impl Workflow {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            jobs: config
                .jobs
                .iter()
                .map(|(name, job)| Job::from_config(name, job))
                .collect(),
        }
    }

    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|j| j.name.as_str()).collect()
    }
}
