// baton/src/core/control.rs

//! Defines the router's decision type and the outcome of a full run.

use crate::core::phase::Phase;
use std::fmt;

/// Router decision: run another phase or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
  /// Execute this phase next.
  Next(Phase),
  /// No further phases; the run is complete.
  Terminal,
}

impl Transition {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Transition::Terminal)
  }

  pub fn phase(&self) -> Option<Phase> {
    match self {
      Transition::Next(phase) => Some(*phase),
      Transition::Terminal => None,
    }
  }
}

impl fmt::Display for Transition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Transition::Next(phase) => write!(f, "{}", phase),
      Transition::Terminal => f.write_str("<terminal>"),
    }
  }
}

/// Outcome of a full orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
  /// The router reached the terminal state.
  Completed,
  /// A cancellation request was observed between steps. The context reflects the
  /// last completed merge.
  Cancelled,
}
