//! Test: job selection and run ordering

use crate::helpers::*;
use lscbuild::execution::EngineError;

const THREE_JOBS: &str = r#"
jobs:
  lint:
    steps:
      - cmd: echo lint >> log
  test:
    steps:
      - cmd: echo test >> log
  package:
    steps:
      - cmd: echo package >> log
"#;

#[tokio::test]
async fn test_all_jobs_run_in_declaration_order() {
    let scenario = Scenario::new();
    let summary = scenario.engine(THREE_JOBS).run(&[]).await.unwrap();

    assert_eq!(scenario.log(), vec!["lint", "test", "package"]);
    let names: Vec<&str> = summary.jobs.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["lint", "test", "package"]);
}

#[tokio::test]
async fn test_explicit_targets_run_in_requested_order() {
    let scenario = Scenario::new();
    let targets = vec!["package".to_string(), "lint".to_string(), "package".to_string()];
    scenario.engine(THREE_JOBS).run(&targets).await.unwrap();

    assert_eq!(scenario.log(), vec!["package", "lint"]);
    assert_eq!(scenario.recorder.started_jobs(), vec!["package", "lint"]);
    assert_eq!(
        scenario.recorder.started_steps(),
        vec!["package/echo package >> log", "lint/echo lint >> log"]
    );
}

#[tokio::test]
async fn test_unknown_job_runs_nothing() {
    let scenario = Scenario::new();
    let targets = vec!["lint".to_string(), "deploy".to_string()];
    let err = scenario.engine(THREE_JOBS).run(&targets).await.unwrap_err();

    assert!(matches!(&err, EngineError::JobNotFound(name) if name == "deploy"));
    assert_eq!(err.to_string(), "job 'deploy' is not found");
    assert!(scenario.log().is_empty());
    assert!(scenario.recorder.events().is_empty());
}

#[tokio::test]
async fn test_run_stops_at_first_failed_job() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  first:
    steps:
      - cmd: echo first >> log
  broken:
    steps:
      - name: explode
        cmd: exit 4
  never:
    steps:
      - cmd: echo never >> log
"#;
    let summary = scenario.execute(yaml).await;

    assert_eq!(scenario.log(), vec!["first"]);
    assert_job_completed(&summary, "first");
    assert_job_failed(&summary, "broken");
    assert!(summary.job("never").is_none());
    assert_eq!(summary.failure().unwrap().name, "broken");

    let err = scenario.engine(yaml).run(&[]).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "job 'broken' failed: step 'explode' failed: command exited with code 4"
    );
}
