// baton/src/orchestrator/definition.rs

//! Contains the `Orchestrator` struct, its configuration, and its construction.

use crate::core::control::Transition;
use crate::core::phase::Phase;
use crate::core::signal::SignalMap;
use crate::error::BatonResult;
use crate::registry::HandlerRegistry;
use crate::router::{self, RouteFn};
use std::fmt;
use std::sync::Arc;

/// Two passes over every phase. The default table never needs more than one.
pub const DEFAULT_MAX_STEPS: usize = 2 * Phase::COUNT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
  /// Steps allowed in one run before it aborts with `BatonError::RunawayLoop`.
  pub max_steps: usize,
  /// Abort with `BatonError::StepFailed` when a handler returns `ok = false`.
  /// The failed envelope is merged before the run aborts.
  pub fail_on_handler_error: bool,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      max_steps: DEFAULT_MAX_STEPS,
      fail_on_handler_error: false,
    }
  }
}

impl OrchestratorConfig {
  pub fn with_max_steps(mut self, max_steps: usize) -> Self {
    self.max_steps = max_steps;
    self
  }

  pub fn with_fail_on_handler_error(mut self, fail: bool) -> Self {
    self.fail_on_handler_error = fail;
    self
  }
}

/// Drives one workflow run at a time per call; itself immutable and shareable across runs.
pub struct Orchestrator {
  pub(crate) registry: Arc<HandlerRegistry>,
  pub(crate) router: Arc<RouteFn>,
  pub(crate) config: OrchestratorConfig,
}

impl Orchestrator {
  /// Creates an orchestrator over `registry` with the default routing table and config.
  pub fn new(registry: HandlerRegistry) -> Self {
    Self {
      registry: Arc::new(registry),
      router: Arc::new(router::route),
      config: OrchestratorConfig::default(),
    }
  }

  pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
    self.config = config;
    self
  }

  /// Replaces the routing table.
  pub fn with_router(mut self, router: impl Fn(Option<Phase>, &SignalMap) -> Transition + Send + Sync + 'static) -> Self {
    self.router = Arc::new(router);
    self
  }

  pub fn config(&self) -> &OrchestratorConfig {
    &self.config
  }

  pub fn registry(&self) -> &HandlerRegistry {
    &self.registry
  }

  /// Fails with `HandlerMissing` unless every phase has a handler.
  pub fn validate(&self) -> BatonResult<()> {
    self.registry.validate()
  }
}

impl fmt::Debug for Orchestrator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Orchestrator")
      .field("registry", &self.registry)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}
