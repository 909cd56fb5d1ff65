// baton/src/core/signal.rs

//! Recognized signal names and the policy for names outside that set.
//!
//! Handlers written in Rust name signals through the [`Signal`] enum, so a typo fails to
//! compile. Signals that arrive as free-form strings (JSON handler output, seeded initial
//! context) go through [`parse_signal_map`] and the configured [`UnknownSignalPolicy`].

use crate::error::{BatonError, BatonResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
  // Read by the router.
  NeedsAltSourcing,
  OnRoute,
  ReassignCourier,
  ProposeSplitDelivery,
  RequireReroute,
  NeedBackupCourier,
  RerouteDone,

  // Informational only.
  IssueDetected,
  RefundInitiated,
  SplitSuccessful,
  FindNewCourier,
  SpawnSecondDispatch,
  PolicyBlock,
  PolicyWarn,
  ChangeApplied,
  Notified,
  AuditPersisted,
}

impl Signal {
  pub const ALL: [Signal; 17] = [
    Signal::NeedsAltSourcing,
    Signal::OnRoute,
    Signal::ReassignCourier,
    Signal::ProposeSplitDelivery,
    Signal::RequireReroute,
    Signal::NeedBackupCourier,
    Signal::RerouteDone,
    Signal::IssueDetected,
    Signal::RefundInitiated,
    Signal::SplitSuccessful,
    Signal::FindNewCourier,
    Signal::SpawnSecondDispatch,
    Signal::PolicyBlock,
    Signal::PolicyWarn,
    Signal::ChangeApplied,
    Signal::Notified,
    Signal::AuditPersisted,
  ];

  /// The signals the default routing table branches on.
  pub const ROUTING: [Signal; 7] = [
    Signal::NeedsAltSourcing,
    Signal::OnRoute,
    Signal::ReassignCourier,
    Signal::ProposeSplitDelivery,
    Signal::RequireReroute,
    Signal::NeedBackupCourier,
    Signal::RerouteDone,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Signal::NeedsAltSourcing => "needs_alt_sourcing",
      Signal::OnRoute => "on_route",
      Signal::ReassignCourier => "reassign_courier",
      Signal::ProposeSplitDelivery => "propose_split_delivery",
      Signal::RequireReroute => "require_reroute",
      Signal::NeedBackupCourier => "need_backup_courier",
      Signal::RerouteDone => "reroute_done",
      Signal::IssueDetected => "issue_detected",
      Signal::RefundInitiated => "refund_initiated",
      Signal::SplitSuccessful => "split_successful",
      Signal::FindNewCourier => "find_new_courier",
      Signal::SpawnSecondDispatch => "spawn_second_dispatch",
      Signal::PolicyBlock => "policy_block",
      Signal::PolicyWarn => "policy_warn",
      Signal::ChangeApplied => "change_applied",
      Signal::Notified => "notified",
      Signal::AuditPersisted => "audit_persisted",
    }
  }

  pub fn is_routing(&self) -> bool {
    Self::ROUTING.contains(self)
  }
}

impl fmt::Display for Signal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Signal {
  type Err = BatonError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Signal::ALL
      .iter()
      .copied()
      .find(|signal| signal.as_str() == s)
      .ok_or_else(|| BatonError::UnknownSignal { name: s.to_string() })
  }
}

/// Accumulated or per-step signal values, keyed by recognized signal.
pub type SignalMap = BTreeMap<Signal, Value>;

/// What to do with a signal name outside the recognized set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownSignalPolicy {
  /// Drop it, logging at DEBUG.
  Ignore,
  /// Drop it, logging at WARN.
  #[default]
  Warn,
  /// Fail with `BatonError::UnknownSignal`.
  Reject,
}

impl FromStr for UnknownSignalPolicy {
  type Err = BatonError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "ignore" => Ok(UnknownSignalPolicy::Ignore),
      "warn" => Ok(UnknownSignalPolicy::Warn),
      "reject" => Ok(UnknownSignalPolicy::Reject),
      other => Err(BatonError::Configuration {
        message: format!("unknown signal policy '{}' (expected ignore, warn or reject)", other),
      }),
    }
  }
}

/// Converts a free-form `name -> value` object into a [`SignalMap`] under `policy`.
pub fn parse_signal_map(raw: &Map<String, Value>, policy: UnknownSignalPolicy) -> BatonResult<SignalMap> {
  let mut signals = SignalMap::new();
  for (name, value) in raw {
    match Signal::from_str(name) {
      Ok(signal) => {
        signals.insert(signal, value.clone());
      }
      Err(err) => match policy {
        UnknownSignalPolicy::Ignore => {
          event!(Level::DEBUG, signal = %name, "Dropping unrecognized signal.");
        }
        UnknownSignalPolicy::Warn => {
          event!(Level::WARN, signal = %name, "Dropping unrecognized signal.");
        }
        UnknownSignalPolicy::Reject => return Err(err),
      },
    }
  }
  Ok(signals)
}

/// Truthiness of a signal value: false, null, zero, and empty strings/arrays/objects are false.
pub fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(flag) => *flag,
    Value::Number(n) => n.as_f64().map_or(false, |v| v != 0.0),
    Value::String(s) => !s.is_empty(),
    Value::Array(items) => !items.is_empty(),
    Value::Object(map) => !map.is_empty(),
  }
}

/// Looks up `signal` with a default of false when absent.
pub fn signal_flag(signals: &SignalMap, signal: Signal) -> bool {
  signals.get(&signal).map_or(false, is_truthy)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn truthiness_follows_json_emptiness() {
    assert!(!is_truthy(&json!(null)));
    assert!(!is_truthy(&json!(false)));
    assert!(!is_truthy(&json!(0)));
    assert!(!is_truthy(&json!(0.0)));
    assert!(!is_truthy(&json!("")));
    assert!(!is_truthy(&json!([])));
    assert!(!is_truthy(&json!({})));
    assert!(is_truthy(&json!(true)));
    assert!(is_truthy(&json!(2)));
    assert!(is_truthy(&json!("yes")));
    assert!(is_truthy(&json!([1])));
    assert!(is_truthy(&json!({"k": 1})));
  }

  #[test]
  fn names_round_trip_through_from_str() {
    for signal in Signal::ALL {
      assert_eq!(signal.as_str().parse::<Signal>().unwrap(), signal);
    }
    assert!("reroute_dun".parse::<Signal>().is_err());
  }

  #[test]
  fn serde_name_matches_as_str() {
    for signal in Signal::ALL {
      assert_eq!(serde_json::to_value(signal).unwrap(), json!(signal.as_str()));
    }
  }

  #[test]
  fn parse_signal_map_applies_policy() {
    let raw = json!({"on_route": true, "teleported": true});
    let raw = raw.as_object().unwrap();

    let lenient = parse_signal_map(raw, UnknownSignalPolicy::Warn).unwrap();
    assert_eq!(lenient.len(), 1);
    assert!(signal_flag(&lenient, Signal::OnRoute));

    let quiet = parse_signal_map(raw, UnknownSignalPolicy::Ignore).unwrap();
    assert_eq!(quiet, lenient);

    match parse_signal_map(raw, UnknownSignalPolicy::Reject) {
      Err(BatonError::UnknownSignal { name }) => assert_eq!(name, "teleported"),
      other => panic!("expected UnknownSignal, got {:?}", other),
    }
  }

  #[test]
  fn policy_parses_case_insensitively() {
    assert_eq!("WARN".parse::<UnknownSignalPolicy>().unwrap(), UnknownSignalPolicy::Warn);
    assert_eq!(" reject ".parse::<UnknownSignalPolicy>().unwrap(), UnknownSignalPolicy::Reject);
    assert!("loud".parse::<UnknownSignalPolicy>().is_err());
  }
}
