//! Run context - paths and overrides shared by every job of one run

use std::path::PathBuf;

/// File name of the overlay environment file inside the run root
pub const OVERLAY_FILE_NAME: &str = "lscbuild.env";

/// Directory under the run root that holds cloned plugin repositories
pub const PLUGIN_DIR_NAME: &str = "plugins";

/// Per-run paths and global overrides
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Directory relative step paths and guards resolve against
    pub workdir: PathBuf,

    /// Temporary root holding scripts, the overlay file and the plugin cache
    pub run_root: PathBuf,

    /// Mutable `KEY=VALUE` file steps and plugins can append to
    pub overlay_file: PathBuf,

    /// Root of the plugin cache
    pub plugin_root: PathBuf,

    /// Overrides supplied once for the whole run
    pub global_env: Vec<String>,
}

impl RunContext {
    pub fn new(workdir: PathBuf, run_root: PathBuf, global_env: Vec<String>) -> Self {
        let overlay_file = run_root.join(OVERLAY_FILE_NAME);
        let plugin_root = run_root.join(PLUGIN_DIR_NAME);
        Self {
            workdir,
            run_root,
            overlay_file,
            plugin_root,
            global_env,
        }
    }

    /// Resolve a step directory against the workdir
    pub fn resolve_dir(&self, dir: Option<&std::path::Path>) -> PathBuf {
        match dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => self.workdir.join(dir),
            None => self.workdir.clone(),
        }
    }
}
