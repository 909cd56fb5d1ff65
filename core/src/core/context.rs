// baton/src/core/context.rs

//! Defines `OrderContext`, the state threaded through one workflow run.
//!
//! Domain fields live in an open JSON object. The reserved parts (accumulated signals,
//! the audit trail and the current phase marker) are typed and only writable from inside
//! the crate: handlers see a projected copy, the merge engine and orchestrator mutate.

use crate::core::audit::AuditEntry;
use crate::core::phase::Phase;
use crate::core::signal::{parse_signal_map, SignalMap, UnknownSignalPolicy};
use crate::error::{BatonError, BatonResult};
use serde_json::{Map, Value};

pub const SIGNALS_KEY: &str = "signals";
pub const AUDIT_KEY: &str = "audit";
pub const PHASE_KEY: &str = "_phase";

/// Keys that never live in the open field map.
pub const RESERVED_KEYS: [&str; 3] = [SIGNALS_KEY, AUDIT_KEY, PHASE_KEY];

pub fn is_reserved_key(key: &str) -> bool {
  RESERVED_KEYS.contains(&key)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderContext {
  pub(crate) fields: Map<String, Value>,
  pub(crate) signals: SignalMap,
  pub(crate) audit: Vec<AuditEntry>,
  pub(crate) phase: Option<Phase>,
}

impl OrderContext {
  /// Builds a context from caller-supplied initial fields.
  ///
  /// A `signals` object seeds the accumulated signal map under `policy`. `audit` and
  /// `_phase` belong to the engine and are rejected.
  pub fn from_fields(mut fields: Map<String, Value>, policy: UnknownSignalPolicy) -> BatonResult<Self> {
    for key in [AUDIT_KEY, PHASE_KEY] {
      if fields.contains_key(key) {
        return Err(BatonError::Configuration {
          message: format!("initial context may not set reserved key '{}'", key),
        });
      }
    }

    let signals = match fields.remove(SIGNALS_KEY) {
      None | Some(Value::Null) => SignalMap::new(),
      Some(Value::Object(raw)) => parse_signal_map(&raw, policy)?,
      Some(other) => {
        return Err(BatonError::Configuration {
          message: format!("initial 'signals' must be an object, found {}", json_kind(&other)),
        })
      }
    };

    Ok(Self {
      fields,
      signals,
      audit: Vec::new(),
      phase: None,
    })
  }

  /// Same as [`OrderContext::from_fields`], for a JSON document that must be an object.
  pub fn from_value(value: Value, policy: UnknownSignalPolicy) -> BatonResult<Self> {
    match value {
      Value::Object(fields) => Self::from_fields(fields, policy),
      other => Err(BatonError::Configuration {
        message: format!("initial context must be a JSON object, found {}", json_kind(&other)),
      }),
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.fields.get(key)
  }

  pub fn fields(&self) -> &Map<String, Value> {
    &self.fields
  }

  /// Accumulated signals across every merged step.
  pub fn signals(&self) -> &SignalMap {
    &self.signals
  }

  pub fn audit(&self) -> &[AuditEntry] {
    &self.audit
  }

  /// The phase whose envelope the orchestrator merged last. A run resumes after it.
  pub fn phase(&self) -> Option<Phase> {
    self.phase
  }

  pub(crate) fn stamp_phase(&mut self, phase: Phase) {
    self.phase = Some(phase);
  }

  /// Renders the complete snapshot: fields plus `signals`, `audit` and `_phase`.
  pub fn to_value(&self) -> Value {
    let mut out = self.fields.clone();
    out.insert(
      SIGNALS_KEY.to_string(),
      Value::Object(
        self
          .signals
          .iter()
          .map(|(signal, value)| (signal.as_str().to_string(), value.clone()))
          .collect(),
      ),
    );
    out.insert(
      AUDIT_KEY.to_string(),
      serde_json::to_value(&self.audit).unwrap_or_else(|_| Value::Array(Vec::new())),
    );
    out.insert(
      PHASE_KEY.to_string(),
      self.phase.map_or(Value::Null, |p| Value::String(p.as_str().to_string())),
    );
    Value::Object(out)
  }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
