//! Test: `if` guards on files, directories and environment

use crate::helpers::*;
use lscbuild::core::{SkipReason, StepState};

#[tokio::test]
async fn test_path_guards() {
    let scenario = Scenario::new();
    std::fs::create_dir(scenario.path("src")).unwrap();
    std::fs::write(scenario.path("Makefile"), "all:\n").unwrap();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: has-makefile
        cmd: echo has-makefile >> log
        if:
          - file:
              exists: Makefile
      - name: no-cargo
        cmd: echo no-cargo >> log
        if:
          - file:
              missing: Cargo.toml
      - name: has-src
        cmd: echo has-src >> log
        if:
          - directory:
              exists: src
              missing: target
      - name: missing-docs
        cmd: echo missing-docs >> log
        if:
          - directory:
              exists: docs
"#;
    let summary = scenario.execute(yaml).await;

    assert_eq!(scenario.log(), vec!["has-makefile", "no-cargo", "has-src"]);
    assert!(matches!(
        step_state(&summary, "build", "missing-docs"),
        StepState::Skipped { reason: SkipReason::GuardFalse }
    ));
    assert_job_completed(&summary, "build");
}

#[tokio::test]
async fn test_all_guard_entries_must_hold() {
    let scenario = Scenario::new();
    std::fs::write(scenario.path("present"), "").unwrap();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: both
        cmd: echo both >> log
        if:
          - file:
              exists: present
          - file:
              exists: absent
"#;
    let summary = scenario.execute(yaml).await;

    assert_step_skipped(&summary, "build", "both");
    assert!(scenario.log().is_empty());
}

#[tokio::test]
async fn test_env_equality_and_negation() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    steps:
      - name: release
        cmd: echo release >> log
        env: [TARGET=release]
        if:
          - env: [TARGET=release]
      - name: debug
        cmd: echo debug >> log
        env: [TARGET=release]
        if:
          - env: [TARGET=debug]
      - name: not-debug
        cmd: echo not-debug >> log
        env: [TARGET=release]
        if:
          - env: [TARGET!=debug]
      - name: not-release
        cmd: echo not-release >> log
        env: [TARGET=release]
        if:
          - env: [TARGET!=release]
"#;
    let summary = scenario.execute(yaml).await;

    assert_eq!(scenario.log(), vec!["release", "not-debug"]);
    assert_step_skipped(&summary, "build", "debug");
    assert_step_skipped(&summary, "build", "not-release");
}

#[tokio::test]
async fn test_env_guard_matches_step_entries_only() {
    let scenario = Scenario::new().with_global_env(&["FOO=global"]);
    let yaml = r#"
jobs:
  build:
    env: [JOBVAR=bar]
    steps:
      - name: job-env-only
        cmd: echo job-env-only >> log
        if:
          - env: [JOBVAR=bar]
      - name: step-declared
        cmd: echo "step-declared $FOO" >> log
        env: [FOO=bar]
        if:
          - env: [FOO=bar]
      - name: job-env-negated
        cmd: echo job-env-negated >> log
        if:
          - env: [JOBVAR!=bar]
"#;
    let summary = scenario.execute(yaml).await;

    assert!(matches!(
        step_state(&summary, "build", "job-env-only"),
        StepState::Skipped { reason: SkipReason::GuardFalse }
    ));
    // the guard passes on the declared pair while the child sees the override
    assert_eq!(scenario.log(), vec!["step-declared global", "job-env-negated"]);
    assert_job_completed(&summary, "build");
}

#[tokio::test]
async fn test_env_guard_expands_references() {
    let scenario = Scenario::new();
    let yaml = r#"
jobs:
  build:
    env: [EXPECTED=linux]
    steps:
      - name: expanded
        cmd: echo expanded >> log
        env: [PLATFORM=linux]
        if:
          - env: ["PLATFORM=${EXPECTED}"]
      - name: unset
        cmd: echo unset >> log
        env: [PLATFORM=linux]
        if:
          - env: ["PLATFORM=${NOT_DEFINED_ANYWHERE}"]
"#;
    let summary = scenario.execute(yaml).await;

    assert_eq!(scenario.log(), vec!["expanded"]);
    assert_step_skipped(&summary, "build", "unset");
}

#[tokio::test]
async fn test_guard_on_plugin_step() {
    let scenario = Scenario::new().with_plugin(
        "owner/tool",
        "plugin:\n  lifecycle:\n    run:\n      cmd: echo run >> {workdir}/log\n",
    );
    let yaml = r#"
jobs:
  build:
    steps:
      - name: guarded
        use: owner/tool
        if:
          - file:
              exists: never-there
"#;
    let summary = scenario.execute(yaml).await;

    assert_step_skipped(&summary, "build", "guarded");
    assert!(scenario.log().is_empty());
    assert_job_completed(&summary, "build");
}
