// baton/src/orchestrator/mod.rs

//! Defines the `Orchestrator`, its configuration, and the run loop.

pub mod definition;
pub mod execution;

pub use definition::{Orchestrator, OrchestratorConfig, DEFAULT_MAX_STEPS};
