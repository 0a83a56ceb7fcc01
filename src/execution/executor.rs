//! Step executor - runs one command step as a child process

use crate::{
    core::{environment, Environment, Job, RunContext, Step},
    execution::script,
};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Why a step's command did not succeed
#[derive(Debug, Error)]
pub enum StepError {
    #[error("failed to compose environment: {0}")]
    Environment(#[from] dotenvy::Error),

    #[error("failed to write script: {0}")]
    Script(#[source] std::io::Error),

    #[error("failed to start '{shell}': {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command exited with {}", describe_exit(.code))]
    Exit { code: Option<i32> },

    #[error("step has no command body")]
    NotACommand,

    #[error("plugin '{0}' declares no run lifecycle step")]
    MissingRunTemplate(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Runs command steps: compose env, materialize script, spawn, wait
#[derive(Debug, Clone, Default)]
pub struct StepExecutor {
    debug: bool,
}

impl StepExecutor {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Compose the step's environment and run it
    pub async fn run_step(&self, job: &Job, step: &Step, ctx: &RunContext) -> Result<(), StepError> {
        let env = environment::compose(job, step, ctx)?;
        self.run_command(job, step, &env, ctx).await
    }

    /// Run a command step with an already composed environment.
    ///
    /// Standard streams are inherited. The script file lives until the
    /// child exits and is removed on every path out of this function.
    pub async fn run_command(
        &self,
        job: &Job,
        step: &Step,
        env: &Environment,
        ctx: &RunContext,
    ) -> Result<(), StepError> {
        let body = step.cmd().ok_or(StepError::NotACommand)?;
        let shell = job.shell();
        let script = script::materialize(body, &shell, &ctx.run_root).map_err(StepError::Script)?;
        let dir = ctx.resolve_dir(step.dir.as_deref());

        if self.debug {
            info!("Script {} for step '{}':\n{}", script.path().display(), step.display_name(), body);
            info!("Step env: {}", step.env.join(" "));
        }
        debug!("Running {} in {}", shell.spec(), dir.display());

        let mut child = Command::new(shell.program())
            .args(shell.invocation_args(script.path()))
            .current_dir(&dir)
            .env_clear()
            .envs(env.pairs().filter(|(key, _)| !key.is_empty()))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| StepError::Spawn {
                shell: shell.spec().to_string(),
                source,
            })?;

        let status = child.wait().await.map_err(|source| StepError::Spawn {
            shell: shell.spec().to_string(),
            source,
        })?;
        drop(script);

        if status.success() {
            Ok(())
        } else {
            warn!("Step '{}' exited with {:?}", step.display_name(), status.code());
            Err(StepError::Exit {
                code: status.code(),
            })
        }
    }
}
