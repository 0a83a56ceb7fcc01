//! Scenario tests: YAML workflows run end to end through the engine
#![cfg(unix)]

mod helpers;

mod error_flow;
mod guards;
mod targets;
