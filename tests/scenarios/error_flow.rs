//! Test: sticky error state, error-only steps and ignore_error

use crate::helpers::*;
use lscbuild::core::{SkipReason, StepState};

#[tokio::test]
async fn test_ignore_error_resumes_normal_flow() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: a
        cmd: exit 1
      - name: b
        cmd: echo b >> log
        ignore_error: true
      - name: c
        cmd: echo c >> log
"#;
    let summary = scenario.execute(yaml).await;

    assert_step_failed(&summary, "build", "a");
    assert_step_completed(&summary, "build", "b");
    assert_step_completed(&summary, "build", "c");
    assert_job_completed(&summary, "build");
    assert_eq!(scenario.log(), vec!["b", "c"]);
}

#[tokio::test]
async fn test_plain_steps_skipped_until_recovery() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: a
        cmd: exit 1
      - name: skipped
        cmd: echo skipped >> log
      - name: recover
        cmd: exit 3
        ignore_error: true
      - name: after
        cmd: echo after >> log
"#;
    let summary = scenario.execute(yaml).await;

    assert!(matches!(
        step_state(&summary, "build", "skipped"),
        StepState::Skipped { reason: SkipReason::PriorError }
    ));
    assert!(matches!(
        step_state(&summary, "build", "recover"),
        StepState::Failed { ignored: true, .. }
    ));
    assert_job_completed(&summary, "build");
    assert_eq!(scenario.log(), vec!["after"]);
}

#[tokio::test]
async fn test_error_handler_with_ignore_error_clears_state() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: a
        cmd: exit 1
      - name: b
        cmd: echo b >> log; exit 7
        ignore_error: true
        if:
          - is_error: true
      - name: c
        cmd: echo c >> log
"#;
    let summary = scenario.execute(yaml).await;

    assert_step_failed(&summary, "build", "a");
    assert!(matches!(
        step_state(&summary, "build", "b"),
        StepState::Failed { ignored: true, .. }
    ));
    assert_step_completed(&summary, "build", "c");
    assert_job_completed(&summary, "build");
    assert_eq!(scenario.log(), vec!["b", "c"]);
}

#[tokio::test]
async fn test_ignore_error_on_failing_step_keeps_state_ok() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: flaky
        cmd: exit 1
        ignore_error: true
      - name: next
        cmd: echo next >> log
"#;
    let summary = scenario.execute(yaml).await;

    assert_job_completed(&summary, "build");
    assert_eq!(scenario.log(), vec!["next"]);
}

#[tokio::test]
async fn test_error_handler_runs_and_error_stays_sticky() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: a
        cmd: exit 1
      - name: report
        cmd: echo report >> log
        if:
          - is_error: true
      - name: c
        cmd: echo c >> log
"#;
    let summary = scenario.execute(yaml).await;

    assert_step_completed(&summary, "build", "report");
    assert!(matches!(
        step_state(&summary, "build", "c"),
        StepState::Skipped { reason: SkipReason::PriorError }
    ));
    assert_job_failed(&summary, "build");
    assert_eq!(scenario.log(), vec!["report"]);
    // the job reports the step that caused the error, not the handler
    assert!(job(&summary, "build").error.as_deref().unwrap().contains("step 'a' failed"));
}

#[tokio::test]
async fn test_error_handler_skipped_without_error() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: a
        cmd: echo a >> log
      - name: report
        cmd: echo report >> log
        if:
          - is_error: true
"#;
    let summary = scenario.execute(yaml).await;

    assert!(matches!(
        step_state(&summary, "build", "report"),
        StepState::Skipped { reason: SkipReason::NoPriorError }
    ));
    assert_job_completed(&summary, "build");
    assert_eq!(scenario.log(), vec!["a"]);
}

#[tokio::test]
async fn test_guard_skipped_ignore_error_does_not_reset() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: a
        cmd: exit 1
      - name: recover
        cmd: echo recover >> log
        ignore_error: true
        if:
          - is_error: true
            file:
              exists: no-such-file
      - name: c
        cmd: echo c >> log
"#;
    let summary = scenario.execute(yaml).await;

    assert!(matches!(
        step_state(&summary, "build", "recover"),
        StepState::Skipped { reason: SkipReason::GuardFalse }
    ));
    assert_step_skipped(&summary, "build", "c");
    assert_job_failed(&summary, "build");
    assert!(scenario.log().is_empty());
}

#[tokio::test]
async fn test_spawn_failure_is_a_step_error() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    shell: /nonexistent/shell
    steps:
      - name: a
        cmd: "true"
"#;
    let summary = scenario.execute(yaml).await;

    assert_step_failed(&summary, "build", "a");
    assert_job_failed(&summary, "build");
}

#[tokio::test]
async fn test_failed_step_event_is_emitted_once() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: a
        cmd: exit 2
"#;
    scenario.execute(yaml).await;

    let failures: Vec<_> = scenario
        .recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, lscbuild::ExecutionEvent::StepFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
}
