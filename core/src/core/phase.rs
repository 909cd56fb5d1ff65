// baton/src/core/phase.rs

//! The closed set of workflow phases.

use crate::error::BatonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One named stage of the dispatch workflow. Each phase maps to exactly one step handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Payment,
  Merchant,
  Dispatch,
  Reputation,
  Capacity,
  Split,
  Weather,
  Breakdown,
  Reroute,
  CustomerChange,
  Policy,
  Notify,
  Audit,
}

impl Phase {
  /// Every phase, in declaration order.
  pub const ALL: [Phase; 13] = [
    Phase::Payment,
    Phase::Merchant,
    Phase::Dispatch,
    Phase::Reputation,
    Phase::Capacity,
    Phase::Split,
    Phase::Weather,
    Phase::Breakdown,
    Phase::Reroute,
    Phase::CustomerChange,
    Phase::Policy,
    Phase::Notify,
    Phase::Audit,
  ];

  pub const COUNT: usize = Self::ALL.len();

  pub fn as_str(&self) -> &'static str {
    match self {
      Phase::Payment => "payment",
      Phase::Merchant => "merchant",
      Phase::Dispatch => "dispatch",
      Phase::Reputation => "reputation",
      Phase::Capacity => "capacity",
      Phase::Split => "split",
      Phase::Weather => "weather",
      Phase::Breakdown => "breakdown",
      Phase::Reroute => "reroute",
      Phase::CustomerChange => "customer_change",
      Phase::Policy => "policy",
      Phase::Notify => "notify",
      Phase::Audit => "audit",
    }
  }

  /// Short human-readable description recorded as the audit entry's `thought`.
  pub fn thought(&self) -> &'static str {
    match self {
      Phase::Payment => "Payment check",
      Phase::Merchant => "Merchant status & stock",
      Phase::Dispatch => "Courier dispatch",
      Phase::Reputation => "Courier reputation gate",
      Phase::Capacity => "Capacity check",
      Phase::Split => "Split delivery negotiation",
      Phase::Weather => "Weather check",
      Phase::Breakdown => "Breakdown/idle detection",
      Phase::Reroute => "Reroute / reassignment",
      Phase::CustomerChange => "Customer-initiated change",
      Phase::Policy => "Policy / SLA validation",
      Phase::Notify => "Notify stakeholders",
      Phase::Audit => "Persist audit trace",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Phase {
  type Err = BatonError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Phase::ALL
      .iter()
      .copied()
      .find(|phase| phase.as_str() == s)
      .ok_or_else(|| BatonError::UnknownPhase { name: s.to_string() })
  }
}
