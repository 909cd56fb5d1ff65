// baton/src/core/projection.rs

//! Per-phase input views.
//!
//! A handler never sees the whole `OrderContext`. Before each step the orchestrator copies
//! the fields listed in the phase's [`Projection`] into a fresh [`PhaseInput`]. Missing or
//! null source paths are left out; defaults are the handler's business.

use crate::core::context::{json_kind, OrderContext};
use crate::core::phase::Phase;
use crate::error::{BatonError, BatonResult};
use serde_json::{Map, Value};

/// Copies the value at `path` (walked through nested objects) into input key `input`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldProjection {
  pub input: &'static str,
  pub path: &'static [&'static str],
}

const fn field(input: &'static str, path: &'static [&'static str]) -> FieldProjection {
  FieldProjection { input, path }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
  Fields(&'static [FieldProjection]),
  /// `thoughts` and `events` derived from the audit trail, plus the full snapshot as `state_diff`.
  AuditTrail,
}

const PAYMENT: &[FieldProjection] = &[
  field("payment", &["payment"]),
  field("order_total", &["order_total"]),
  field("user_prefs", &["user_prefs"]),
];

const MERCHANT: &[FieldProjection] = &[field("merchant_id", &["merchant_id"]), field("items", &["items"])];

const DISPATCH: &[FieldProjection] = &[
  field("pickup_location", &["pickup_location"]),
  field("drop_location", &["drop_location"]),
  field("readiness_eta_min", &["readiness_eta_min"]),
  field("priority_flag", &["priority_flag"]),
];

const REPUTATION: &[FieldProjection] = &[
  field("courier_candidate_id", &["courier", "id"]),
  field("historical_kpis", &["historical_kpis"]),
];

const CAPACITY: &[FieldProjection] = &[field("order_id", &["order_id"]), field("courier_id", &["courier", "id"])];

const SPLIT: &[FieldProjection] = &[
  field("order_id", &["order_id"]),
  field("customer_response", &["customer_response"]),
  field("overflow_items", &["capacity", "overflow_items"]),
  field("courier_pool", &["courier_pool"]),
  field("policy_split_rules", &["policy_split_rules"]),
  field("user_prefs", &["user_prefs"]),
];

const WEATHER: &[FieldProjection] = &[
  field("courier_location", &["pickup_location", "city"]),
  field("destination_city", &["drop_location", "city"]),
];

const BREAKDOWN: &[FieldProjection] = &[
  field("courier_id", &["courier", "id"]),
  field("telemetry", &["telemetry"]),
  field("route", &["route"]),
];

const REROUTE: &[FieldProjection] = &[
  field("reason", &["reroute_reason"]),
  field("current_courier", &["courier", "id"]),
  field("candidate_pool", &["candidate_pool"]),
  field("weather_advice", &["weather", "advice"]),
];

const CUSTOMER_CHANGE: &[FieldProjection] = &[
  field("request", &["customer_change_request"]),
  field("courier_position", &["courier_position"]),
  field("policy_change_rules", &["policy_change_rules"]),
];

const POLICY: &[FieldProjection] = &[
  field("eta_min", &["route", "eta_min"]),
  field("sla_eta_min", &["sla_eta_min"]),
  field("price_delta", &["price_delta"]),
  field("credits", &["credits"]),
  field("split_plan", &["split_plan"]),
  field("change_fees", &["change_fees"]),
];

const NOTIFY: &[FieldProjection] = &[
  field("event", &["notify_event"]),
  field("payload", &["notify_payload"]),
  field("target", &["notify_targets"]),
];

impl Phase {
  /// The fixed input view for this phase.
  pub fn projection(&self) -> Projection {
    match self {
      Phase::Payment => Projection::Fields(PAYMENT),
      Phase::Merchant => Projection::Fields(MERCHANT),
      Phase::Dispatch => Projection::Fields(DISPATCH),
      Phase::Reputation => Projection::Fields(REPUTATION),
      Phase::Capacity => Projection::Fields(CAPACITY),
      Phase::Split => Projection::Fields(SPLIT),
      Phase::Weather => Projection::Fields(WEATHER),
      Phase::Breakdown => Projection::Fields(BREAKDOWN),
      Phase::Reroute => Projection::Fields(REROUTE),
      Phase::CustomerChange => Projection::Fields(CUSTOMER_CHANGE),
      Phase::Policy => Projection::Fields(POLICY),
      Phase::Notify => Projection::Fields(NOTIFY),
      Phase::Audit => Projection::AuditTrail,
    }
  }
}

/// The read-only view a handler receives.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseInput {
  pub phase: Phase,
  pub fields: Map<String, Value>,
}

impl PhaseInput {
  pub fn new(phase: Phase, fields: Map<String, Value>) -> Self {
    Self { phase, fields }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.fields.get(key)
  }

  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.get(key).and_then(Value::as_str)
  }

  pub fn get_f64(&self, key: &str) -> Option<f64> {
    self.get(key).and_then(Value::as_f64)
  }

  pub fn get_i64(&self, key: &str) -> Option<i64> {
    self.get(key).and_then(Value::as_i64)
  }

  pub fn get_bool(&self, key: &str) -> Option<bool> {
    self.get(key).and_then(Value::as_bool)
  }

  pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
    self.get(key).and_then(Value::as_object)
  }

  pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
    self.get(key).and_then(Value::as_array)
  }
}

/// Builds `phase`'s input view from the current context.
pub fn project(ctx: &OrderContext, phase: Phase) -> BatonResult<PhaseInput> {
  let mut fields = Map::new();
  match phase.projection() {
    Projection::Fields(specs) => {
      for spec in specs {
        if let Some(value) = resolve_path(ctx.fields(), spec.path, phase)? {
          fields.insert(spec.input.to_string(), value.clone());
        }
      }
    }
    Projection::AuditTrail => {
      let thoughts: Vec<Value> = ctx
        .audit()
        .iter()
        .filter_map(|entry| entry.reason.as_deref())
        .filter(|reason| !reason.is_empty())
        .map(|reason| Value::String(reason.to_string()))
        .collect();
      let events: Vec<Value> = ctx
        .audit()
        .iter()
        .map(|entry| Value::String(entry.event_label()))
        .collect();
      fields.insert("thoughts".to_string(), Value::Array(thoughts));
      fields.insert("events".to_string(), Value::Array(events));
      fields.insert("state_diff".to_string(), ctx.to_value());
    }
  }
  Ok(PhaseInput::new(phase, fields))
}

fn resolve_path<'a>(root: &'a Map<String, Value>, path: &[&str], phase: Phase) -> BatonResult<Option<&'a Value>> {
  let Some((first, rest)) = path.split_first() else {
    return Ok(None);
  };
  let mut current = root.get(*first);
  for (depth, segment) in rest.iter().enumerate() {
    current = match current {
      None | Some(Value::Null) => return Ok(None),
      Some(Value::Object(map)) => map.get(*segment),
      Some(other) => {
        return Err(BatonError::Projection {
          phase,
          path: path[..=depth].join("."),
          found: json_kind(other).to_string(),
        })
      }
    };
  }
  Ok(current.filter(|value| !value.is_null()))
}
