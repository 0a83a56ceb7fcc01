//! Shell specification and platform dispatch

use std::path::Path;

/// Family of shell, decides script extension and invocation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Posix,
    Cmd,
    PowerShell,
}

impl ShellKind {
    /// File extension of materialized scripts
    pub fn extension(&self) -> &'static str {
        match self {
            ShellKind::Posix => ".sh",
            ShellKind::Cmd => ".bat",
            ShellKind::PowerShell => ".ps1",
        }
    }
}

/// A parsed `shell` field: program, leading arguments and kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    spec: String,
    program: String,
    args: Vec<String>,
    kind: ShellKind,
}

impl Shell {
    /// Parse a whitespace separated shell spec such as `bash -e`.
    /// Returns `None` for a blank spec.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        let args = parts.collect();
        let kind = kind_of(&program);

        Some(Self {
            spec: spec.trim().to_string(),
            program,
            args,
            kind,
        })
    }

    /// Platform shell used when a job does not declare one
    pub fn platform_default() -> Self {
        let spec = if cfg!(windows) { "powershell" } else { "/bin/sh" };
        Self::parse(spec).unwrap_or_else(|| Self {
            spec: spec.to_string(),
            program: spec.to_string(),
            args: Vec::new(),
            kind: kind_of(spec),
        })
    }

    /// The spec as written, exported as `SHELL`
    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    /// Arguments that run `script` with this shell
    pub fn invocation_args(&self, script: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        match self.kind {
            ShellKind::Posix => {}
            ShellKind::Cmd => args.push("/C".to_string()),
            ShellKind::PowerShell => args.extend(
                ["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-File"]
                    .into_iter()
                    .map(str::to_string),
            ),
        }
        args.push(script.to_string_lossy().into_owned());
        args
    }
}

fn kind_of(program: &str) -> ShellKind {
    let stem = Path::new(program)
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match stem.as_str() {
        "cmd" => ShellKind::Cmd,
        "powershell" | "pwsh" => ShellKind::PowerShell,
        _ => ShellKind::Posix,
    }
}
