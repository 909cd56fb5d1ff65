// baton/src/core/envelope.rs

//! The uniform result contract every step handler returns.

use crate::core::signal::{parse_signal_map, Signal, SignalMap, UnknownSignalPolicy};
use crate::error::{BatonError, BatonResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{event, Level};

/// Numeric observability data attached to a step result. Never used for control flow.
pub type Metrics = BTreeMap<String, f64>;

/// Result of one step.
///
/// `updates` is the only open-ended part: top-level context field name to JSON value.
/// Everything the router reads travels in `signals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  pub ok: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
  #[serde(default)]
  pub updates: Map<String, Value>,
  #[serde(default)]
  pub signals: SignalMap,
  #[serde(default)]
  pub metrics: Metrics,
}

impl Envelope {
  /// An empty successful result.
  pub fn success() -> Self {
    Self {
      ok: true,
      reason: None,
      updates: Map::new(),
      signals: SignalMap::new(),
      metrics: Metrics::new(),
    }
  }

  /// A failed result carrying `reason`. Still merged and routed like any other envelope.
  pub fn failure(reason: impl Into<String>) -> Self {
    Self {
      ok: false,
      reason: Some(reason.into()),
      ..Self::success()
    }
  }

  pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
    self.reason = Some(reason.into());
    self
  }

  pub fn with_update(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.updates.insert(key.into(), value.into());
    self
  }

  pub fn with_signal(mut self, signal: Signal, value: impl Into<Value>) -> Self {
    self.signals.insert(signal, value.into());
    self
  }

  /// Shorthand for `with_signal(signal, true)`.
  pub fn with_flag(self, signal: Signal) -> Self {
    self.with_signal(signal, true)
  }

  pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
    self.metrics.insert(name.into(), value);
    self
  }

  /// Parses a loosely shaped JSON result.
  ///
  /// `ok` is required. Signal names outside [`Signal`] are handled per `policy`; metric
  /// values that are not numbers are dropped.
  pub fn from_json(value: Value, policy: UnknownSignalPolicy) -> BatonResult<Self> {
    let raw: RawEnvelope = serde_json::from_value(value).map_err(|source| BatonError::InvalidEnvelope { source })?;

    let signals = parse_signal_map(&raw.signals, policy)?;

    let mut metrics = Metrics::new();
    for (name, metric) in raw.metrics {
      match metric.as_f64() {
        Some(v) => {
          metrics.insert(name, v);
        }
        None => event!(Level::DEBUG, metric = %name, "Dropping non-numeric metric."),
      }
    }

    Ok(Self {
      ok: raw.ok,
      reason: raw.reason,
      updates: raw.updates,
      signals,
      metrics,
    })
  }
}

#[derive(Deserialize)]
struct RawEnvelope {
  ok: bool,
  #[serde(default)]
  reason: Option<String>,
  #[serde(default)]
  updates: Map<String, Value>,
  #[serde(default)]
  signals: Map<String, Value>,
  #[serde(default)]
  metrics: Map<String, Value>,
}
