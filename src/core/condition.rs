//! Conditional guards and their evaluation

use crate::core::{
    config::{ConditionalConfig, PathCheckConfig},
    environment::Environment,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Presence/absence checks for one kind of filesystem entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathCheck {
    pub exists: Option<String>,
    pub missing: Option<String>,
}

impl PathCheck {
    fn from_config(config: Option<&PathCheckConfig>) -> Self {
        config
            .map(|c| PathCheck {
                exists: c.exists.clone(),
                missing: c.missing.clone(),
            })
            .unwrap_or_default()
    }
}

/// One guard entry; every present predicate must hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditional {
    pub directory: PathCheck,
    pub file: PathCheck,
    pub env: Vec<String>,
    pub is_error: bool,
}

impl Conditional {
    pub fn from_config(config: &ConditionalConfig) -> Self {
        Conditional {
            directory: PathCheck::from_config(config.directory.as_ref()),
            file: PathCheck::from_config(config.file.as_ref()),
            env: config.env.clone(),
            is_error: config.is_error,
        }
    }

    /// Evaluate the filesystem and environment predicates of this entry.
    /// The error marker is handled by the step state machine, not here.
    ///
    /// `env` is the composed environment used for `${VAR}` expansion;
    /// `declared` is the step's own `env` list the pairs are matched against.
    pub fn holds(&self, base: &Path, env: &Environment, declared: &[String]) -> bool {
        let directory_ok = check_path(base, self.directory.exists.as_deref(), PathKind::Dir, true)
            && check_path(base, self.directory.missing.as_deref(), PathKind::Dir, false);
        let file_ok = check_path(base, self.file.exists.as_deref(), PathKind::File, true)
            && check_path(base, self.file.missing.as_deref(), PathKind::File, false);

        directory_ok && file_ok && self.env.iter().all(|p| env_predicate_holds(p, env, declared))
    }
}

/// Evaluate a whole guard list (AND across entries)
pub fn evaluate(conditions: &[Conditional], base: &Path, env: &Environment, declared: &[String]) -> bool {
    conditions.iter().all(|c| c.holds(base, env, declared))
}

#[derive(Debug, Clone, Copy)]
enum PathKind {
    Dir,
    File,
}

fn check_path(base: &Path, path: Option<&str>, kind: PathKind, want_present: bool) -> bool {
    let Some(path) = path else {
        return true;
    };
    let Some(absolute) = resolve(base, path) else {
        debug!("Guard path '{}' could not be resolved", path);
        return false;
    };

    let present = match kind {
        PathKind::Dir => absolute.is_dir(),
        PathKind::File => absolute.is_file(),
    };
    present == want_present
}

fn resolve(base: &Path, path: &str) -> Option<PathBuf> {
    if path.is_empty() {
        return None;
    }
    std::path::absolute(base.join(path)).ok()
}

/// `KEY=VALUE` holds when that exact pair is among the step's declared
/// entries; `KEY!=VALUE` holds when it is not. `${VAR}` is expanded first.
fn env_predicate_holds(predicate: &str, env: &Environment, declared: &[String]) -> bool {
    let expanded = env.expand(predicate);

    let (pair, negated) = match expanded.split_once("!=") {
        Some((key, value)) => (format!("{}={}", key, value), true),
        None => (expanded, false),
    };

    if !pair.contains('=') {
        debug!("Malformed env guard '{}'", predicate);
        return false;
    }

    let present = declared.iter().any(|entry| *entry == pair);
    present != negated
}
