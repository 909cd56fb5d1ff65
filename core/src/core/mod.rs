pub mod audit;
pub mod context;
pub mod context_data;
pub mod control;
pub mod envelope;
pub mod phase;
pub mod projection;
pub mod signal;
pub mod step;

// Re-export key types for easier access from other Baton modules (and lib.rs)
pub use audit::AuditEntry;
pub use context::OrderContext;
pub use context_data::ContextData;
pub use control::{RunResult, Transition};
pub use envelope::{Envelope, Metrics};
pub use phase::Phase;
pub use projection::{PhaseInput, Projection};
pub use signal::{Signal, SignalMap, UnknownSignalPolicy};
pub use step::{EnvelopeFuture, Handler, StepHandler};
