//! Test utilities for lscbuild scenarios

use async_trait::async_trait;
use lscbuild::core::config::{BuildConfig, DEFAULT_CONFIG_FILE};
use lscbuild::core::{JobReport, JobStatus, RunSummary, StepState};
use lscbuild::execution::{EngineConfig, ExecutionEngine, ExecutionEvent};
use lscbuild::plugin::{GitReference, PluginError, PluginSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Placeholder replaced by the scenario's working directory in YAML fixtures
pub const WORKDIR: &str = "{workdir}";

/// In-process plugin source: repositories are YAML strings keyed by identifier
#[derive(Clone, Default)]
pub struct FakeSource {
    repositories: HashMap<String, String>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl FakeSource {
    pub fn with_plugin(mut self, repository: &str, yaml: &str) -> Self {
        self.repositories.insert(repository.to_string(), yaml.to_string());
        self
    }

    /// References passed to `fetch`, in call order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PluginSource for FakeSource {
    async fn fetch(&self, reference: &GitReference, dest: &Path) -> Result<(), PluginError> {
        self.fetched.lock().unwrap().push(reference.to_string());
        let yaml = self
            .repositories
            .get(&reference.repository)
            .ok_or_else(|| PluginError::Clone {
                repository: reference.repository.clone(),
                message: "repository not found".to_string(),
            })?;
        std::fs::create_dir_all(dest).unwrap();
        std::fs::write(dest.join(DEFAULT_CONFIG_FILE), yaml).unwrap();
        Ok(())
    }
}

/// Collects every event emitted during a run
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<ExecutionEvent>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Names of steps that started, as `job/step`
    pub fn started_steps(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::StepStarted { job, step, .. } => Some(format!("{}/{}", job, step)),
                _ => None,
            })
            .collect()
    }

    pub fn started_jobs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::JobStarted { job } => Some(job),
                _ => None,
            })
            .collect()
    }
}

/// A temporary working directory plus the engine pieces wired to it
pub struct Scenario {
    pub workdir: TempDir,
    pub source: FakeSource,
    pub recorder: Recorder,
    global_env: Vec<String>,
}

impl Scenario {
    pub fn new() -> Self {
        Self {
            workdir: tempfile::tempdir().unwrap(),
            source: FakeSource::default(),
            recorder: Recorder::default(),
            global_env: Vec::new(),
        }
    }

    pub fn with_plugin(mut self, repository: &str, yaml: &str) -> Self {
        let yaml = yaml.replace(WORKDIR, &self.workdir_str());
        self.source = self.source.with_plugin(repository, &yaml);
        self
    }

    pub fn with_global_env(mut self, entries: &[&str]) -> Self {
        self.global_env = entries.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.workdir.path().join(relative)
    }

    pub fn workdir_str(&self) -> String {
        self.workdir.path().to_string_lossy().into_owned()
    }

    /// Contents of a file in the working directory, empty when missing
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap_or_default()
    }

    /// Lines of `log`, the file fixtures append to
    pub fn log(&self) -> Vec<String> {
        self.read("log").lines().map(str::to_string).collect()
    }

    pub fn engine(&self, yaml: &str) -> ExecutionEngine<FakeSource> {
        let yaml = yaml.replace(WORKDIR, &self.workdir_str());
        let workflow = BuildConfig::from_yaml(&yaml).unwrap().to_workflow();
        let config = EngineConfig::new(self.workdir.path().to_path_buf())
            .with_global_env(self.global_env.clone());
        let mut engine = ExecutionEngine::new(workflow, config, self.source.clone());

        let events = self.recorder.events.clone();
        engine.add_event_handler(move |event| {
            events.lock().unwrap().push(event.clone());
        });
        engine
    }

    /// Run every job and return the full report
    pub async fn execute(&self, yaml: &str) -> RunSummary {
        self.engine(yaml).execute(&[]).await.unwrap()
    }
}

pub fn job<'a>(summary: &'a RunSummary, name: &str) -> &'a JobReport {
    summary
        .job(name)
        .unwrap_or_else(|| panic!("job '{}' not in summary", name))
}

pub fn step_state<'a>(summary: &'a RunSummary, job_name: &str, step: &str) -> &'a StepState {
    &job(summary, job_name)
        .step(step)
        .unwrap_or_else(|| panic!("step '{}' not in job '{}'", step, job_name))
        .state
}

pub fn assert_job_completed(summary: &RunSummary, name: &str) {
    let report = job(summary, name);
    assert_eq!(
        report.status,
        JobStatus::Completed,
        "job '{}' failed: {:?}",
        name,
        report.error
    );
}

pub fn assert_job_failed(summary: &RunSummary, name: &str) {
    assert_eq!(job(summary, name).status, JobStatus::Failed, "job '{}' should fail", name);
}

pub fn assert_step_completed(summary: &RunSummary, job_name: &str, step: &str) {
    let state = step_state(summary, job_name, step);
    assert!(
        matches!(state, StepState::Completed { .. }),
        "step '{}' should complete, got {:?}",
        step,
        state
    );
}

pub fn assert_step_failed(summary: &RunSummary, job_name: &str, step: &str) {
    let state = step_state(summary, job_name, step);
    assert!(
        matches!(state, StepState::Failed { .. }),
        "step '{}' should fail, got {:?}",
        step,
        state
    );
}

pub fn assert_step_skipped(summary: &RunSummary, job_name: &str, step: &str) {
    let state = step_state(summary, job_name, step);
    assert!(
        matches!(state, StepState::Skipped { .. }),
        "step '{}' should be skipped, got {:?}",
        step,
        state
    );
}
