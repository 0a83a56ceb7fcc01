//! Git CLI plugin source - clones plugin repositories with `git`

use crate::plugin::{GitReference, PluginError, PluginSource};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Fetches plugins by shelling out to `git clone`
#[derive(Debug, Clone)]
pub struct GitCliSource {
    /// Path to git executable
    git_path: String,
}

impl GitCliSource {
    /// Create a source using `git_path` (e.g., "git", "/usr/bin/git")
    pub fn new(git_path: impl Into<String>) -> Self {
        Self {
            git_path: git_path.into(),
        }
    }

    #[cfg(test)]
    pub fn git_path(&self) -> &str {
        &self.git_path
    }

    /// Arguments for a shallow clone of `reference` into `dest`
    fn clone_args(reference: &GitReference, dest: &Path) -> Vec<String> {
        let mut args = vec![
            "clone".to_string(),
            "--quiet".to_string(),
            "--depth".to_string(),
            "1".to_string(),
        ];
        if let Some(name) = reference.short_name() {
            args.push("--branch".to_string());
            args.push(name.to_string());
        }
        args.push(reference.remote_url());
        args.push(dest.to_string_lossy().into_owned());
        args
    }
}

impl Default for GitCliSource {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl PluginSource for GitCliSource {
    async fn fetch(&self, reference: &GitReference, dest: &Path) -> Result<(), PluginError> {
        let args = Self::clone_args(reference, dest);
        debug!("Running {} {}", self.git_path, args.join(" "));

        let output = Command::new(&self.git_path)
            .args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PluginError::Clone {
                repository: reference.repository.clone(),
                message: format!("failed to execute {}: {}", self.git_path, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("git clone of {} exited with code {}: {}", reference, exit_code, stderr.trim());
            return Err(PluginError::Clone {
                repository: reference.repository.clone(),
                message: format!("git exited with code {}: {}", exit_code, stderr.trim()),
            });
        }

        Ok(())
    }
}
