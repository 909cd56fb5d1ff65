// baton/src/registry.rs

//! Defines `HandlerRegistry`, the phase-keyed table of step handlers.
//!
//! The table is filled once at startup and then shared read-only by the orchestrator.
//! Closure adapters (`on`, `on_fallible`, `on_json`) box user functions into the uniform
//! [`StepHandler`] shape, translating errors into failed envelopes so a handler can never
//! abort a run.

use crate::core::envelope::Envelope;
use crate::core::phase::Phase;
use crate::core::projection::PhaseInput;
use crate::core::signal::UnknownSignalPolicy;
use crate::core::step::{EnvelopeFuture, Handler, StepHandler};
use crate::error::{BatonError, BatonResult};

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{event, Level};

#[derive(Default)]
pub struct HandlerRegistry {
  handlers: HashMap<Phase, Arc<dyn StepHandler>>,
  unknown_signals: UnknownSignalPolicy,
}

impl HandlerRegistry {
  /// Creates an empty registry with the default unknown-signal policy (`Warn`).
  pub fn new() -> Self {
    Self::default()
  }

  /// Policy applied by [`HandlerRegistry::on_json`] handlers registered afterwards.
  pub fn with_unknown_signal_policy(mut self, policy: UnknownSignalPolicy) -> Self {
    self.unknown_signals = policy;
    self
  }

  pub fn unknown_signal_policy(&self) -> UnknownSignalPolicy {
    self.unknown_signals
  }

  /// Registers `handler` for `phase`, replacing any previous one.
  pub fn register(&mut self, phase: Phase, handler: impl StepHandler + 'static) -> &mut Self {
    self.register_arc(phase, Arc::new(handler))
  }

  pub fn register_arc(&mut self, phase: Phase, handler: Arc<dyn StepHandler>) -> &mut Self {
    if self.handlers.insert(phase, handler).is_some() {
      event!(Level::DEBUG, %phase, "Replacing previously registered handler.");
    } else {
      event!(Level::DEBUG, %phase, "Handler registered.");
    }
    self
  }

  /// Registers an async closure that always produces an envelope.
  pub fn on<F>(&mut self, phase: Phase, handler_fn: impl Fn(PhaseInput) -> F + Send + Sync + 'static) -> &mut Self
  where
    F: Future<Output = Envelope> + Send + 'static,
  {
    let handler: Handler = Box::new(move |input: PhaseInput| -> EnvelopeFuture { Box::pin(handler_fn(input)) });
    self.register(phase, handler)
  }

  /// Registers an async closure that may fail. An `Err` becomes `ok = false` with the
  /// error chain as the reason.
  pub fn on_fallible<F>(
    &mut self,
    phase: Phase,
    handler_fn: impl Fn(PhaseInput) -> F + Send + Sync + 'static,
  ) -> &mut Self
  where
    F: Future<Output = anyhow::Result<Envelope>> + Send + 'static,
  {
    let handler: Handler = Box::new(move |input: PhaseInput| -> EnvelopeFuture {
      let phase = input.phase;
      let user_fut = handler_fn(input);
      Box::pin(async move {
        user_fut.await.unwrap_or_else(|err| {
          event!(Level::WARN, %phase, error = %format!("{:#}", err), "Handler failed; reporting as failed envelope.");
          Envelope::failure(format!("{:#}", err))
        })
      })
    });
    self.register(phase, handler)
  }

  /// Registers an async closure producing a loosely shaped JSON envelope, parsed with this
  /// registry's unknown-signal policy. Handler errors and unparseable payloads both become
  /// failed envelopes.
  pub fn on_json<F>(&mut self, phase: Phase, handler_fn: impl Fn(PhaseInput) -> F + Send + Sync + 'static) -> &mut Self
  where
    F: Future<Output = anyhow::Result<Value>> + Send + 'static,
  {
    let policy = self.unknown_signals;
    let handler: Handler = Box::new(move |input: PhaseInput| -> EnvelopeFuture {
      let phase = input.phase;
      let user_fut = handler_fn(input);
      Box::pin(async move {
        let parsed = match user_fut.await {
          Ok(value) => Envelope::from_json(value, policy),
          Err(err) => Err(BatonError::from(err)),
        };
        parsed.unwrap_or_else(|err| {
          event!(Level::WARN, %phase, error = %err, "JSON handler produced no usable envelope.");
          Envelope::failure(err.to_string())
        })
      })
    });
    self.register(phase, handler)
  }

  pub fn lookup(&self, phase: Phase) -> Option<Arc<dyn StepHandler>> {
    self.handlers.get(&phase).cloned()
  }

  /// Looks a handler up by phase name. Unrecognized names find nothing.
  pub fn lookup_name(&self, phase: &str) -> Option<Arc<dyn StepHandler>> {
    Phase::from_str(phase).ok().and_then(|phase| self.lookup(phase))
  }

  pub fn contains(&self, phase: Phase) -> bool {
    self.handlers.contains_key(&phase)
  }

  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }

  /// Phases with a handler, in declaration order.
  pub fn phases(&self) -> Vec<Phase> {
    Phase::ALL.iter().copied().filter(|p| self.contains(*p)).collect()
  }

  /// Phases without a handler, in declaration order.
  pub fn missing_phases(&self) -> Vec<Phase> {
    Phase::ALL.iter().copied().filter(|p| !self.contains(*p)).collect()
  }

  /// Startup check that every phase has a handler.
  pub fn validate(&self) -> BatonResult<()> {
    match self.missing_phases().first() {
      Some(phase) => {
        event!(Level::ERROR, %phase, "Registry is missing a handler.");
        Err(BatonError::HandlerMissing { phase: *phase })
      }
      None => Ok(()),
    }
  }
}

impl fmt::Debug for HandlerRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HandlerRegistry")
      .field("phases", &self.phases())
      .field("unknown_signals", &self.unknown_signals)
      .finish()
  }
}
