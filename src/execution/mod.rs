//! Job execution: target selection, step state machine and process spawning

pub mod engine;
pub mod executor;
pub mod scheduler;
pub mod script;

pub use engine::{EngineConfig, EngineError, EventBus, EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{StepError, StepExecutor};
pub use scheduler::select_jobs;
