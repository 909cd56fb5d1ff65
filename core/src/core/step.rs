// baton/src/core/step.rs

//! Defines the `StepHandler` trait and the boxed-closure `Handler` type it is most often
//! built from.

use crate::core::envelope::Envelope;
use crate::core::projection::PhaseInput;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// A pluggable business-rule unit for one phase.
///
/// Implementations receive a projected copy of the context and report everything through
/// the returned [`Envelope`]. They must not fail: internal faults become `ok = false` with
/// a populated `reason`. Any I/O happens here; the orchestrator awaits completion before
/// merging.
#[async_trait]
pub trait StepHandler: Send + Sync {
  async fn handle(&self, input: PhaseInput) -> Envelope;
}

/// The boxed future a closure-backed handler returns.
pub type EnvelopeFuture = Pin<Box<dyn Future<Output = Envelope> + Send>>;

/// Type alias for a closure-backed step handler.
///
/// A handler takes ownership of its `PhaseInput` and returns a `Future` resolving to an
/// `Envelope`.
pub type Handler = Box<dyn Fn(PhaseInput) -> EnvelopeFuture + Send + Sync>;

#[async_trait]
impl StepHandler for Handler {
  async fn handle(&self, input: PhaseInput) -> Envelope {
    (self)(input).await
  }
}
