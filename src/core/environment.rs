//! Execution environment and its layered composition

use crate::core::{context::RunContext, job::Job, step::Step};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;
use tracing::warn;

/// Marker set for every step so scripts can tell they run under lscbuild
pub const MARKER_VAR: &str = "LSCBUILD";
/// Path of the overlay file shared by the steps and plugins of a run
pub const ENV_FILE_VAR: &str = "LSCBUILD_ENV_FILE";
/// Working directory of the invoking job, given to plugin lifecycle steps
pub const WORKDIR_VAR: &str = "LSCBUILD_WORKDIR";

static VAR_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("variable pattern is valid")
});

/// Ordered `KEY=VALUE` entries. A key may appear several times;
/// the last occurrence is the effective value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    entries: Vec<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn set(&mut self, key: &str, value: impl AsRef<str>) {
        self.entries.push(format!("{}={}", key, value.as_ref()));
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, entries: I) {
        self.entries.extend(entries);
    }

    /// Raw entries in composition order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Effective value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs()
            .filter(|(k, _)| *k == key)
            .last()
            .map(|(_, v)| v)
    }

    /// Key/value pairs in order, duplicates included; entries without `=` are dropped
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| entry.split_once('='))
    }

    /// Replace `${VAR}` with its effective value (empty when unset)
    pub fn expand(&self, text: &str) -> String {
        VAR_REF
            .replace_all(text, |caps: &Captures| {
                self.get(&caps[1]).unwrap_or_default().to_string()
            })
            .into_owned()
    }
}

/// Read every entry of the overlay file, in file order. A missing file is empty.
///
/// Lines that do not parse are logged and skipped; only I/O errors fail.
pub fn read_overlay(path: &Path) -> Result<Vec<String>, dotenvy::Error> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for item in dotenvy::from_path_iter(path)? {
        match item {
            Ok((key, value)) => entries.push(format!("{}={}", key, value)),
            Err(dotenvy::Error::LineParse(line, index)) => {
                warn!("Skipping overlay line '{}' in {} (at {})", line, path.display(), index);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(entries)
}

/// Compose the environment of one step.
///
/// Layers, later wins: ambient process env, marker, job env, step env,
/// global overrides, `SHELL`, Windows error action, overlay file path,
/// overlay file contents (read now).
pub fn compose(job: &Job, step: &Step, ctx: &RunContext) -> Result<Environment, dotenvy::Error> {
    let mut env = Environment::new();

    env.extend(std::env::vars_os().map(|(key, value)| {
        format!("{}={}", key.to_string_lossy(), value.to_string_lossy())
    }));
    env.set(MARKER_VAR, "1");
    env.extend(job.env.iter().cloned());
    env.extend(step.env.iter().cloned());
    env.extend(ctx.global_env.iter().cloned());
    env.set("SHELL", job.shell().spec());
    if cfg!(windows) {
        env.set("ErrorActionPreference", "Stop");
    }
    env.set(ENV_FILE_VAR, ctx.overlay_file.to_string_lossy());
    env.extend(read_overlay(&ctx.overlay_file)?);

    Ok(env)
}
