//! Main execution engine - orchestrates jobs, plugins and the step state machine

use crate::{
    core::{
        condition, environment, ErrorState, Gate, Job, JobReport, JobStatus, RunContext,
        RunSummary, SkipReason, Step, StepAction, StepRecord, StepState, Workflow,
    },
    execution::{scheduler, StepError, StepExecutor},
    plugin::{PluginError, PluginManager, PluginSource},
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: Uuid,
        jobs: Vec<String>,
    },
    JobStarted {
        job: String,
    },
    PluginFetching {
        plugin: String,
    },
    PluginInitializing {
        job: String,
        plugin: String,
    },
    StepStarted {
        job: String,
        step: String,
        command: Option<String>,
    },
    StepSkipped {
        job: String,
        step: String,
        reason: SkipReason,
    },
    StepCompleted {
        job: String,
        step: String,
    },
    StepFailed {
        job: String,
        step: String,
        error: String,
        ignored: bool,
    },
    PluginFinalizing {
        job: String,
        plugin: String,
    },
    PluginRemoved {
        plugin: String,
    },
    JobCompleted {
        job: String,
        status: JobStatus,
        error: Option<String>,
    },
    RunCompleted {
        execution_id: Uuid,
        success: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Fan-out of events to every registered handler
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Vec<EventHandler>,
}

impl EventBus {
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    pub fn emit(&self, event: ExecutionEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }
}

/// Errors surfaced by a run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job '{0}' is not found")]
    JobNotFound(String),

    #[error("failed to prepare run directory: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("job '{job}' failed: {reason}")]
    JobFailed { job: String, reason: String },

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// Immutable settings fixed when the engine is built
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Extra diagnostics (script bodies, step env)
    pub debug: bool,

    /// Directory relative paths resolve against
    pub workdir: PathBuf,

    /// Overrides applied to every step of the run
    pub global_env: Vec<String>,

    /// Parent of the per-run temporary root (system temp dir when `None`)
    pub temp_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new(workdir: PathBuf) -> Self {
        Self {
            debug: false,
            workdir,
            global_env: Vec::new(),
            temp_dir: None,
        }
    }

    /// Config anchored at the process working directory
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_global_env(mut self, global_env: Vec<String>) -> Self {
        self.global_env = global_env;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = Some(temp_dir);
        self
    }
}

/// What came out of a job's step loop
struct StepLoop {
    state: ErrorState,
    failure: Option<String>,
}

/// Main execution engine
pub struct ExecutionEngine<S> {
    workflow: Workflow,
    config: EngineConfig,
    executor: StepExecutor,
    plugins: PluginManager<S>,
    events: EventBus,
}

impl<S: PluginSource> ExecutionEngine<S> {
    pub fn new(workflow: Workflow, config: EngineConfig, source: S) -> Self {
        let executor = StepExecutor::new(config.debug);
        Self {
            workflow,
            config,
            executor,
            plugins: PluginManager::new(source),
            events: EventBus::default(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
    }

    /// Run the selected jobs (all when `targets` is empty).
    ///
    /// Fails with the first failed job; see [`ExecutionEngine::execute`] for
    /// the full report.
    pub async fn run(&mut self, targets: &[String]) -> Result<RunSummary, EngineError> {
        let summary = self.execute(targets).await?;
        if let Some(failed) = summary.failure() {
            return Err(EngineError::JobFailed {
                job: failed.name.clone(),
                reason: failed.error.clone().unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(summary)
    }

    /// Run the selected jobs and report every job that started.
    ///
    /// Errors only when nothing could run: unknown job or no temporary root.
    /// The run stops after the first failed job.
    pub async fn execute(&mut self, targets: &[String]) -> Result<RunSummary, EngineError> {
        let jobs: Vec<Job> = scheduler::select_jobs(&self.workflow, targets)?
            .into_iter()
            .cloned()
            .collect();

        let mut builder = tempfile::Builder::new();
        builder.prefix("lscbuild-");
        let run_root = match &self.config.temp_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(EngineError::Workspace)?;

        let ctx = RunContext::new(
            self.config.workdir.clone(),
            run_root.path().to_path_buf(),
            self.config.global_env.clone(),
        );
        std::fs::write(&ctx.overlay_file, "").map_err(EngineError::Workspace)?;
        std::fs::create_dir_all(&ctx.plugin_root).map_err(EngineError::Workspace)?;

        let mut summary = RunSummary::new();
        info!("Starting run {} ({} jobs)", summary.execution_id, jobs.len());
        self.events.emit(ExecutionEvent::RunStarted {
            execution_id: summary.execution_id,
            jobs: jobs.iter().map(|j| j.name.clone()).collect(),
        });

        for job in &jobs {
            let report = self.execute_job(job, &ctx).await;
            let failed = report.status == JobStatus::Failed;
            summary.jobs.push(report);
            if failed {
                break;
            }
        }

        self.events.emit(ExecutionEvent::RunCompleted {
            execution_id: summary.execution_id,
            success: summary.is_success(),
        });

        if let Err(e) = run_root.close() {
            warn!("Failed to remove run directory: {}", e);
        }
        Ok(summary)
    }

    /// Run one job: initialize plugins, step loop, finalize plugins.
    /// Every failure is turned into the job's report.
    async fn execute_job(&mut self, job: &Job, ctx: &RunContext) -> JobReport {
        info!("Starting job: {}", job.name);
        self.events.emit(ExecutionEvent::JobStarted {
            job: job.name.clone(),
        });
        let started_at = Utc::now();
        let mut steps = Vec::new();

        let mut errors = Vec::new();
        match self.process_job(job, ctx, &mut steps).await {
            Ok(StepLoop { state: ErrorState::Errored, failure }) => {
                errors.push(failure.unwrap_or_else(|| "a step failed".to_string()));
            }
            Ok(_) => {}
            Err(e) => {
                error!("Job {} aborted: {}", job.name, e);
                errors.push(e.to_string());
            }
        }

        if let Err(e) = self
            .plugins
            .finalize(job, ctx, &self.executor, &self.events)
            .await
        {
            errors.push(e.to_string());
        }

        let (status, error) = if errors.is_empty() {
            (JobStatus::Completed, None)
        } else {
            (JobStatus::Failed, Some(errors.join("; ")))
        };

        info!("Job {} finished: {:?}", job.name, status);
        self.events.emit(ExecutionEvent::JobCompleted {
            job: job.name.clone(),
            status,
            error: error.clone(),
        });

        JobReport {
            name: job.name.clone(),
            status,
            steps,
            error,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Plugin initialization and the step state machine
    async fn process_job(
        &mut self,
        job: &Job,
        ctx: &RunContext,
        records: &mut Vec<StepRecord>,
    ) -> Result<StepLoop, EngineError> {
        self.plugins
            .initialize(job, ctx, &self.executor, &self.events)
            .await?;

        let mut state = ErrorState::Ok;
        let mut failure: Option<String> = None;

        for step in &job.steps {
            let name = step.display_name();

            if let Gate::Skip(reason) = state.gate(step) {
                self.skip(job, &name, reason, records);
                continue;
            }

            let started_at = Utc::now();
            let result = match environment::compose(job, step, ctx) {
                Err(e) => Err(StepError::from(e)),
                Ok(env) => {
                    if !condition::evaluate(&step.conditions, &ctx.workdir, &env, &step.env) {
                        self.skip(job, &name, SkipReason::GuardFalse, records);
                        continue;
                    }
                    info!("Running step: {}", name);
                    self.events.emit(ExecutionEvent::StepStarted {
                        job: job.name.clone(),
                        step: name.clone(),
                        command: step.cmd().map(str::to_string),
                    });
                    self.dispatch(job, step, &env, ctx).await?
                }
            };

            state = state.after(step, result.is_ok());
            if state == ErrorState::Ok {
                failure = None;
            }

            let finished_at = Utc::now();
            let step_state = match result {
                Ok(()) => {
                    self.events.emit(ExecutionEvent::StepCompleted {
                        job: job.name.clone(),
                        step: name.clone(),
                    });
                    StepState::Completed {
                        started_at,
                        completed_at: finished_at,
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Step {} failed: {}", name, message);
                    if !step.ignore_error && failure.is_none() {
                        failure = Some(format!("step '{}' failed: {}", name, message));
                    }
                    self.events.emit(ExecutionEvent::StepFailed {
                        job: job.name.clone(),
                        step: name.clone(),
                        error: message.clone(),
                        ignored: step.ignore_error,
                    });
                    StepState::Failed {
                        error: message,
                        ignored: step.ignore_error,
                        started_at,
                        failed_at: finished_at,
                    }
                }
            };
            records.push(StepRecord {
                name,
                state: step_state,
            });
        }

        Ok(StepLoop { state, failure })
    }

    /// Run a step that passed its gate and guards.
    ///
    /// The inner result is the step's own outcome and feeds the state
    /// machine; the outer error aborts the job.
    async fn dispatch(
        &self,
        job: &Job,
        step: &Step,
        env: &environment::Environment,
        ctx: &RunContext,
    ) -> Result<Result<(), StepError>, EngineError> {
        match &step.action {
            StepAction::Command(_) => Ok(self.executor.run_command(job, step, env, ctx).await),
            StepAction::Plugin(reference) => match self.plugins.run_template(step)? {
                Some(template) => Ok(self.executor.run_step(job, &template, ctx).await),
                None => Ok(Err(StepError::MissingRunTemplate(reference.clone()))),
            },
        }
    }

    fn skip(&self, job: &Job, name: &str, reason: SkipReason, records: &mut Vec<StepRecord>) {
        info!("Skipping step {}: {}", name, reason);
        self.events.emit(ExecutionEvent::StepSkipped {
            job: job.name.clone(),
            step: name.to_string(),
            reason,
        });
        records.push(StepRecord {
            name: name.to_string(),
            state: StepState::Skipped { reason },
        });
    }
}
