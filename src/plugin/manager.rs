//! Plugin manager - fetch, cache and lifecycle instantiation

use crate::{
    core::{
        config::{BuildConfig, DEFAULT_CONFIG_FILE},
        environment::{ENV_FILE_VAR, WORKDIR_VAR},
        Job, RunContext, Step,
    },
    execution::{EventBus, ExecutionEvent, StepExecutor},
    plugin::{GitReference, Plugin, PluginError, PluginSource},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A fetched plugin and where its repository lives
#[derive(Debug, Clone)]
pub struct CachedPlugin {
    pub reference: GitReference,
    pub plugin: Plugin,
    pub path: PathBuf,
}

/// Owns the plugin cache of one run
///
/// Entries are keyed by repository identifier. They are created when a job
/// that uses the plugin starts and removed, directory included, when it ends.
pub struct PluginManager<S> {
    source: S,
    cache: HashMap<String, CachedPlugin>,

    /// Plugins touched by the current job, in first-use order
    active: Vec<GitReference>,
}

impl<S: PluginSource> PluginManager<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            active: Vec::new(),
        }
    }

    pub fn cached(&self, repository: &str) -> Option<&CachedPlugin> {
        self.cache.get(repository)
    }

    /// Fetch and initialize every plugin referenced by the job's steps.
    ///
    /// Each reference is fetch-checked; a repository already on disk is not
    /// cloned again. Initialize templates run once per repository. Any
    /// failure here is fatal to the job.
    pub async fn initialize(
        &mut self,
        job: &Job,
        ctx: &RunContext,
        executor: &StepExecutor,
        events: &EventBus,
    ) -> Result<(), PluginError> {
        for raw in job.steps.iter().filter_map(Step::plugin_reference) {
            let reference = GitReference::parse(raw)?;
            let first_use = !self
                .active
                .iter()
                .any(|r| r.repository == reference.repository);
            if first_use {
                self.active.push(reference.clone());
            }

            self.fetch(&reference, ctx, events).await?;

            if !first_use {
                continue;
            }

            let Some(cached) = self.cache.get(&reference.repository) else {
                return Err(PluginError::NotInitialized(reference.repository.clone()));
            };
            if let Some(template) = &cached.plugin.lifecycle.initialize {
                let step = instantiate(template, &cached.path, ctx);
                events.emit(ExecutionEvent::PluginInitializing {
                    job: job.name.clone(),
                    plugin: reference.to_string(),
                });
                executor
                    .run_step(job, &step, ctx)
                    .await
                    .map_err(|source| PluginError::Initialize {
                        repository: reference.repository.clone(),
                        source,
                    })?;
            }
        }

        Ok(())
    }

    /// Make sure `reference` is on disk and loaded into the cache
    async fn fetch(
        &mut self,
        reference: &GitReference,
        ctx: &RunContext,
        events: &EventBus,
    ) -> Result<(), PluginError> {
        let dir = reference.cache_dir(&ctx.plugin_root);

        if dir.exists() {
            debug!("Plugin {} already fetched at {}", reference, dir.display());
            if !self.cache.contains_key(&reference.repository) {
                self.load(reference, dir)?;
            }
            return Ok(());
        }

        info!("Fetching plugin {} into {}", reference, dir.display());
        events.emit(ExecutionEvent::PluginFetching {
            plugin: reference.to_string(),
        });

        if let Some(parent) = dir.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PluginError::Clone {
                    repository: reference.repository.clone(),
                    message: format!("failed to create {}: {}", parent.display(), e),
                })?;
        }

        if let Err(e) = self.source.fetch(reference, &dir).await {
            if let Err(cleanup) = remove_dir(&dir).await {
                warn!("Failed to remove partial clone {}: {}", dir.display(), cleanup);
            }
            return Err(e);
        }

        self.load(reference, dir)
    }

    /// Read the plugin definition from a fetched repository
    fn load(&mut self, reference: &GitReference, dir: PathBuf) -> Result<(), PluginError> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);
        let config = BuildConfig::from_file(&config_path).map_err(|e| PluginError::Config {
            repository: reference.repository.clone(),
            message: format!("{}: {}", config_path.display(), e),
        })?;
        let plugin_config = config
            .plugin
            .ok_or_else(|| PluginError::MissingDefinition(reference.repository.clone()))?;

        let plugin = Plugin::from_config(&reference.repository, &plugin_config);
        self.cache.insert(
            reference.repository.clone(),
            CachedPlugin {
                reference: reference.clone(),
                plugin,
                path: dir,
            },
        );
        Ok(())
    }

    /// Instantiate the `run` template for a plugin-invocation step.
    ///
    /// `Ok(None)` when the plugin declares no run template. The invoking
    /// step's env is appended and its `dir` overrides the plugin directory.
    pub fn run_template(&self, invoking: &Step) -> Result<Option<Step>, PluginError> {
        let raw = invoking
            .plugin_reference()
            .ok_or_else(|| PluginError::InvalidReference(invoking.display_name()))?;
        let reference = GitReference::parse(raw)?;
        let cached = self
            .cache
            .get(&reference.repository)
            .ok_or_else(|| PluginError::NotInitialized(reference.repository.clone()))?;

        let Some(template) = &cached.plugin.lifecycle.run else {
            return Ok(None);
        };

        let mut step = template.clone();
        step.name = invoking.name.clone().or(step.name);
        step.env.extend(invoking.env.iter().cloned());
        step.dir = Some(match &invoking.dir {
            Some(dir) => dir.clone(),
            None => plugin_dir(template, &cached.path),
        });
        Ok(Some(step))
    }

    /// Run finalize templates and remove every plugin used by the job.
    ///
    /// Cleanup happens for every plugin even when a finalize step fails;
    /// failures are collected and reported together.
    pub async fn finalize(
        &mut self,
        job: &Job,
        ctx: &RunContext,
        executor: &StepExecutor,
        events: &EventBus,
    ) -> Result<(), PluginError> {
        let mut failures = Vec::new();

        for reference in std::mem::take(&mut self.active) {
            let cached = self.cache.remove(&reference.repository);

            if let Some(cached) = &cached {
                if let Some(template) = &cached.plugin.lifecycle.finalize {
                    let step = instantiate(template, &cached.path, ctx);
                    events.emit(ExecutionEvent::PluginFinalizing {
                        job: job.name.clone(),
                        plugin: reference.to_string(),
                    });
                    if let Err(e) = executor.run_step(job, &step, ctx).await {
                        warn!("Finalize of plugin {} failed: {}", reference, e);
                        failures.push(format!("{}: {}", reference.repository, e));
                    }
                }
            }

            let dir = cached
                .map(|c| c.path)
                .unwrap_or_else(|| reference.cache_dir(&ctx.plugin_root));
            if let Err(e) = remove_dir(&dir).await {
                warn!("Failed to remove plugin directory {}: {}", dir.display(), e);
                failures.push(format!("{}: {}", reference.repository, e));
            }
            events.emit(ExecutionEvent::PluginRemoved {
                plugin: reference.to_string(),
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PluginError::Finalize(failures))
        }
    }
}

/// Deep copy of a lifecycle template bound to the plugin directory, with
/// the invoking workdir and overlay file exported
fn instantiate(template: &Step, plugin_path: &Path, ctx: &RunContext) -> Step {
    let mut step = template.clone();
    step.dir = Some(plugin_dir(template, plugin_path));
    step.env
        .push(format!("{}={}", WORKDIR_VAR, ctx.workdir.display()));
    step.env
        .push(format!("{}={}", ENV_FILE_VAR, ctx.overlay_file.display()));
    step
}

fn plugin_dir(template: &Step, plugin_path: &Path) -> PathBuf {
    match &template.dir {
        Some(dir) => plugin_path.join(dir),
        None => plugin_path.to_path_buf(),
    }
}

async fn remove_dir(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
