//! Build configuration from YAML

use crate::core::Workflow;
use crate::plugin::GitReference;
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the configuration file, also used inside plugin repositories
pub const DEFAULT_CONFIG_FILE: &str = ".lscbuild.yaml";

fn default_version() -> u32 {
    1
}

/// Top-level configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Schema version (defaults to 1)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Jobs in declaration order
    #[serde(default)]
    pub jobs: IndexMap<String, JobConfig>,

    /// Present only when this file is fetched as a plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginConfig>,
}

/// Job configuration as defined in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Shell used to run every step (platform shell when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// `KEY=VALUE` entries applied to every step
    #[serde(default)]
    pub env: Vec<String>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepConfig {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Plugin reference (`owner/repo`, `owner/repo@tag`, `owner/repo#branch`)
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,

    /// Command body, may span several lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,

    /// Working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// `KEY=VALUE` entries for this step only
    #[serde(default)]
    pub env: Vec<String>,

    /// Guard list; every entry must hold
    #[serde(default, rename = "if")]
    pub conditions: Vec<ConditionalConfig>,

    /// Reset the error state after this step runs
    #[serde(default)]
    pub ignore_error: bool,
}

/// Guard entry as defined in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathCheckConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathCheckConfig>,

    /// `KEY=VALUE` or `KEY!=VALUE` predicates, `${VAR}` is expanded
    #[serde(default)]
    pub env: Vec<String>,

    /// Only run when a previous step errored
    #[serde(default)]
    pub is_error: bool,
}

/// Existence checks for a directory or file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathCheckConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
}

/// Plugin definition: a job plus lifecycle templates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(flatten)]
    pub job: JobConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Lifecycle step templates of a plugin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialize: Option<StepConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialize_windows: Option<StepConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<StepConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_windows: Option<StepConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalize: Option<StepConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalize_windows: Option<StepConfig>,
}

impl LifecycleConfig {
    /// All declared templates with their field names
    pub fn templates(&self) -> impl Iterator<Item = (&'static str, &StepConfig)> {
        [
            ("initialize", &self.initialize),
            ("initialize_windows", &self.initialize_windows),
            ("run", &self.run),
            ("run_windows", &self.run_windows),
            ("finalize", &self.finalize),
            ("finalize_windows", &self.finalize_windows),
        ]
        .into_iter()
        .filter_map(|(field, template)| template.as_ref().map(|t| (field, t)))
    }
}

impl BuildConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: BuildConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            anyhow::bail!("unsupported yaml version: {}", self.version);
        }

        for (job_name, job) in &self.jobs {
            for (index, step) in job.steps.iter().enumerate() {
                step.validate()
                    .map_err(|e| anyhow::anyhow!("job '{}' step #{}: {}", job_name, index + 1, e))?;
            }
        }

        if let Some(plugin) = &self.plugin {
            for (index, step) in plugin.job.steps.iter().enumerate() {
                step.validate()
                    .map_err(|e| anyhow::anyhow!("plugin step #{}: {}", index + 1, e))?;
            }
            for (field, template) in plugin.lifecycle.templates() {
                if template.uses.is_some() || template.cmd.is_none() {
                    anyhow::bail!("plugin lifecycle '{}' must define 'cmd' and no 'use'", field);
                }
            }
        }

        Ok(())
    }

    /// Convert config to the workflow domain model
    pub fn to_workflow(&self) -> Workflow {
        Workflow::from_config(self)
    }
}

impl StepConfig {
    /// A step is either a command step or a plugin-invocation step
    pub fn validate(&self) -> Result<()> {
        match (&self.cmd, &self.uses) {
            (Some(_), Some(_)) => anyhow::bail!("'cmd' and 'use' are mutually exclusive"),
            (None, None) => anyhow::bail!("either 'cmd' or 'use' is required"),
            (None, Some(reference)) => {
                GitReference::parse(reference)?;
                Ok(())
            }
            (Some(_), None) => Ok(()),
        }
    }
}
