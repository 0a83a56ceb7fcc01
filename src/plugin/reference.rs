//! Plugin references: `repo`, `repo@tag`, `repo#branch`

use crate::plugin::PluginError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which git ref of the repository to check out
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// The repository's default branch
    Default,
    Tag(String),
    Branch(String),
}

/// A parsed plugin `use` string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitReference {
    /// Repository identifier, also the cache key
    pub repository: String,
    pub kind: RefKind,
}

impl GitReference {
    pub fn parse(input: &str) -> Result<Self, PluginError> {
        let input = input.trim();
        let invalid = || PluginError::InvalidReference(input.to_string());

        let (repository, kind) = if let Some((repo, tag)) = input.split_once('@') {
            (repo, RefKind::Tag(tag.to_string()))
        } else if let Some((repo, branch)) = input.split_once('#') {
            (repo, RefKind::Branch(branch.to_string()))
        } else {
            (input, RefKind::Default)
        };

        if let RefKind::Tag(name) | RefKind::Branch(name) = &kind {
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(invalid());
            }
        }

        let segments: Vec<&str> = repository.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty()
            || repository.contains(char::is_whitespace)
            || segments.iter().any(|s| *s == "." || *s == "..")
        {
            return Err(invalid());
        }

        Ok(Self {
            repository: segments.join("/"),
            kind,
        })
    }

    /// Fully qualified ref, `None` for the default branch
    pub fn ref_name(&self) -> Option<String> {
        match &self.kind {
            RefKind::Default => None,
            RefKind::Tag(tag) => Some(format!("refs/tags/{}", tag)),
            RefKind::Branch(branch) => Some(format!("refs/heads/{}", branch)),
        }
    }

    /// Short tag or branch name, as `git clone --branch` expects it
    pub fn short_name(&self) -> Option<&str> {
        match &self.kind {
            RefKind::Default => None,
            RefKind::Tag(name) | RefKind::Branch(name) => Some(name),
        }
    }

    /// Canonical remote: GitHub for `owner/repo`, the host itself when
    /// the first segment looks like a host name
    pub fn remote_url(&self) -> String {
        let first = self.repository.split('/').next().unwrap_or_default();
        if first.contains('.') {
            format!("https://{}.git", self.repository)
        } else {
            format!("https://github.com/{}.git", self.repository)
        }
    }

    /// Cache directory under `root`, one level per path segment
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        self.repository
            .split('/')
            .fold(root.to_path_buf(), |dir, segment| dir.join(segment))
    }
}

impl fmt::Display for GitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RefKind::Default => write!(f, "{}", self.repository),
            RefKind::Tag(tag) => write!(f, "{}@{}", self.repository, tag),
            RefKind::Branch(branch) => write!(f, "{}#{}", self.repository, branch),
        }
    }
}
