//! Execution state models

use crate::core::step::Step;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sticky error state carried across the steps of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorState {
    /// No unrecovered step failure so far
    #[default]
    Ok,
    /// A prior step failed and nothing has cleared it
    Errored,
}

/// Result of gating a step on the error state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Eligible,
    Skip(SkipReason),
}

impl ErrorState {
    /// Decide whether `step` may proceed to its guards.
    ///
    /// An `ignore_error` step is a recovery point and stays eligible after
    /// an error.
    pub fn gate(&self, step: &Step) -> Gate {
        match (self, step.runs_only_on_error()) {
            (ErrorState::Errored, false) if !step.ignore_error => Gate::Skip(SkipReason::PriorError),
            (ErrorState::Ok, true) => Gate::Skip(SkipReason::NoPriorError),
            _ => Gate::Eligible,
        }
    }

    /// State after `step` executed with `succeeded`
    pub fn after(self, step: &Step, succeeded: bool) -> ErrorState {
        if step.ignore_error {
            ErrorState::Ok
        } else if succeeded {
            self
        } else {
            ErrorState::Errored
        }
    }
}

/// Why a step did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// A previous step errored and this step is not an error handler
    PriorError,
    /// This step only runs after an error and none occurred
    NoPriorError,
    /// Its `if` guards evaluated false
    GuardFalse,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::PriorError => "a previous step failed",
            SkipReason::NoPriorError => "no previous step failed",
            SkipReason::GuardFalse => "condition not met",
        };
        f.write_str(text)
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Step ran and succeeded
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step ran and failed; `ignored` when `ignore_error` cleared the state
    Failed {
        error: String,
        ignored: bool,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Step did not run
    Skipped { reason: SkipReason },
}

impl StepState {
    pub fn ran(&self) -> bool {
        !matches!(self, StepState::Skipped { .. })
    }
}

/// A step and what happened to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub state: StepState,
}

/// Overall job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Report for one job of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub name: String,
    pub status: JobStatus,
    pub steps: Vec<StepRecord>,

    /// Why the job failed
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl JobReport {
    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Report for a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub execution_id: Uuid,
    pub jobs: Vec<JobReport>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            jobs: Vec::new(),
        }
    }

    /// First failed job, if any
    pub fn failure(&self) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.status == JobStatus::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.failure().is_none()
    }

    pub fn job(&self, name: &str) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
