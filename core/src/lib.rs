// src/lib.rs

//! Baton: an async, phase-routed decision pipeline engine for delivery-dispatch workflows.
//!
//! A run hands the order "baton" from phase to phase:
//!  - Each phase has exactly one pluggable step handler, looked up in a `HandlerRegistry`.
//!  - Handlers receive a fixed projection of the order context and answer with an `Envelope`.
//!  - The merge engine folds the envelope into the `OrderContext` and appends an audit entry.
//!  - A pure router picks the next phase from the accumulated signals.
//!  - Runs stop at the terminal state, on cancellation between steps, or on a fatal error.

pub mod core;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod registry;
pub mod router;

// --- Re-exports for the Public API ---

pub use crate::core::audit::AuditEntry;
pub use crate::core::context::OrderContext;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{RunResult, Transition};
pub use crate::core::envelope::{Envelope, Metrics};
pub use crate::core::phase::Phase;
pub use crate::core::projection::{project, PhaseInput, Projection};
pub use crate::core::signal::{is_truthy, parse_signal_map, signal_flag, Signal, SignalMap, UnknownSignalPolicy};
pub use crate::core::step::{EnvelopeFuture, Handler, StepHandler};

pub use crate::error::{BatonError, BatonResult};
pub use crate::merge::merge_envelope;
pub use crate::orchestrator::{Orchestrator, OrchestratorConfig, DEFAULT_MAX_STEPS};
pub use crate::registry::HandlerRegistry;
pub use crate::router::{route, route_name};

// Cancellation handle accepted by `Orchestrator::run_with_cancellation`.
pub use tokio_util::sync::CancellationToken;

/*
    Core Workflow:
    1. Build a `HandlerRegistry` and register one handler per `Phase`, either a type
       implementing `StepHandler` or a closure via `.on()`, `.on_fallible()`, `.on_json()`.
    2. Create an `Orchestrator::new(registry)`, optionally `.with_config(...)`.
    3. Create the initial `OrderContext` (`from_value` / `from_fields`).
    4. Call `orchestrator.execute(ctx).await`, or wrap it in `ContextData` and call
       `run` / `run_with_cancellation` to keep a handle on the context.
    5. Read `ctx.to_value()` for the final snapshot, including `signals` and `audit`.
*/
