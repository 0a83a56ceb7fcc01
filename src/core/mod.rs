//! Core domain models for lscbuild
//!
//! This module defines the configuration schema, the job/step/guard domain
//! model, environment composition and execution state.

pub mod condition;
pub mod config;
pub mod context;
pub mod environment;
pub mod job;
pub mod shell;
pub mod state;
pub mod step;

pub use condition::*;
pub use context::*;
pub use environment::Environment;
pub use job::*;
pub use shell::*;
pub use state::*;
pub use step::*;
