//! lscbuild - run shell-command build jobs declared in YAML

pub mod cli;
pub mod core;
pub mod execution;
pub mod plugin;

// Re-export commonly used types
pub use core::config::BuildConfig;
pub use core::{Job, JobReport, JobStatus, RunSummary, SkipReason, Step, StepState, Workflow};
pub use execution::{EngineConfig, EngineError, ExecutionEngine, ExecutionEvent, StepError};
pub use plugin::{GitCliSource, GitReference, PluginError, PluginSource};
