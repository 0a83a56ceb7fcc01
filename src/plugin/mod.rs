//! Plugins: remote bundles of lifecycle steps wrapped around a job

pub mod manager;
pub mod reference;
pub mod source;

use crate::core::{config::PluginConfig, Job, Step};
use crate::execution::StepError;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub use manager::{CachedPlugin, PluginManager};
pub use reference::{GitReference, RefKind};
pub use source::GitCliSource;

/// Error types for plugin operations
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid plugin reference '{0}'")]
    InvalidReference(String),

    #[error("failed to fetch plugin '{repository}': {message}")]
    Clone { repository: String, message: String },

    #[error("failed to load plugin '{repository}': {message}")]
    Config { repository: String, message: String },

    #[error("plugin '{0}' has no 'plugin' section in its configuration")]
    MissingDefinition(String),

    #[error("plugin '{0}' was used but never initialized for this job")]
    NotInitialized(String),

    #[error("plugin '{repository}' initialize failed: {source}")]
    Initialize {
        repository: String,
        #[source]
        source: StepError,
    },

    #[error("plugin finalize failed: {}", .0.join("; "))]
    Finalize(Vec<String>),
}

/// Where plugin repositories come from
#[async_trait]
pub trait PluginSource: Send + Sync {
    /// Materialize `reference` into the empty directory `dest`
    async fn fetch(&self, reference: &GitReference, dest: &Path) -> Result<(), PluginError>;
}

/// Lifecycle step templates of a plugin
///
/// The `_windows` variants are decoded but never selected; the generic
/// template is used on every platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub initialize: Option<Step>,
    pub initialize_windows: Option<Step>,
    pub run: Option<Step>,
    pub run_windows: Option<Step>,
    pub finalize: Option<Step>,
    pub finalize_windows: Option<Step>,
}

/// A fetched plugin definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    /// Job-shaped part, used only when the plugin repository is run directly
    pub definition: Job,
    pub lifecycle: Lifecycle,
}

impl Plugin {
    pub fn from_config(name: &str, config: &PluginConfig) -> Self {
        let lifecycle = &config.lifecycle;
        let template = |t: &Option<crate::core::config::StepConfig>| t.as_ref().map(Step::from_config);

        Self {
            definition: Job::from_config(name, &config.job),
            lifecycle: Lifecycle {
                initialize: template(&lifecycle.initialize),
                initialize_windows: template(&lifecycle.initialize_windows),
                run: template(&lifecycle.run),
                run_windows: template(&lifecycle.run_windows),
                finalize: template(&lifecycle.finalize),
                finalize_windows: template(&lifecycle.finalize_windows),
            },
        }
    }
}
