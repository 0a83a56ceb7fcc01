//! Job scheduler - determines which jobs to run, and in which order

use crate::core::{Job, Workflow};
use crate::execution::EngineError;

/// Select the jobs to run.
///
/// With no targets every job runs once in declaration order. Otherwise the
/// targets run in the order given (repeats ignored); an unknown name fails
/// before anything runs.
pub fn select_jobs<'a>(workflow: &'a Workflow, targets: &[String]) -> Result<Vec<&'a Job>, EngineError> {
    if targets.is_empty() {
        return Ok(workflow.jobs().iter().collect());
    }

    let mut selected: Vec<&Job> = Vec::with_capacity(targets.len());
    for target in targets {
        let job = workflow
            .job(target)
            .ok_or_else(|| EngineError::JobNotFound(target.clone()))?;
        if !selected.iter().any(|j| j.name == job.name) {
            selected.push(job);
        }
    }
    Ok(selected)
}
