//! Script materialization - step bodies written to temporary files

use crate::core::{Shell, ShellKind};
use std::io::{self, Write};
use std::path::Path;
use tempfile::TempPath;

/// A step body on disk; the file is deleted when this is dropped
#[derive(Debug)]
pub struct Script {
    path: TempPath,
}

impl Script {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `body` to a new temporary file in `dir` with the extension and
/// preamble the shell expects
pub fn materialize(body: &str, shell: &Shell, dir: &Path) -> io::Result<Script> {
    let kind = shell.kind();
    let mut file = tempfile::Builder::new()
        .prefix("lscbuild-step-")
        .suffix(kind.extension())
        .tempfile_in(dir)?;

    if kind == ShellKind::Cmd {
        file.write_all(b"@echo off\r\n")?;
    }
    file.write_all(body.as_bytes())?;
    file.flush()?;

    Ok(Script {
        path: file.into_temp_path(),
    })
}
