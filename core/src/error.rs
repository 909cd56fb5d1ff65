// baton/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::core::phase::Phase;

#[derive(Debug, Error)]
pub enum BatonError {
  #[error("Handler missing for phase: {phase}")]
  HandlerMissing { phase: Phase },

  #[error("Projection failed for phase '{phase}': path '{path}' crosses a non-object value ({found})")]
  Projection {
    phase: Phase,
    path: String,
    found: String,
  },

  #[error("Run exceeded the maximum of {max_steps} steps; the routing table is likely cyclic")]
  RunawayLoop { max_steps: usize },

  #[error("Step '{phase}' reported failure: {reason}")]
  StepFailed { phase: Phase, reason: String },

  #[error("Unknown signal: {name}")]
  UnknownSignal { name: String },

  #[error("Unknown phase: {name}")]
  UnknownPhase { name: String },

  #[error("Envelope payload is malformed. Source: {source}")]
  InvalidEnvelope {
    #[source]
    source: serde_json::Error,
  },

  #[error("Configuration error: {message}")]
  Configuration { message: String },

  #[error("Error in user-provided handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for BatonError {
  fn from(err: AnyhowError) -> Self {
    // Re-wrapping keeps the original chain reachable through `source()`.
    BatonError::HandlerError { source: err }
  }
}

impl BatonError {
  /// True for errors that stem from how the engine was wired rather than from a run's data.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      BatonError::HandlerMissing { .. } | BatonError::Projection { .. } | BatonError::Configuration { .. }
    )
  }
}

pub type BatonResult<T, E = BatonError> = std::result::Result<T, E>;
