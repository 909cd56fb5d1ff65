// baton/demos/dispatch_demo/src/handlers/conditions.rs

use crate::handlers::timed;
use crate::services::MockStore;
use async_trait::async_trait;
use baton::{Envelope, PhaseInput, Signal, StepHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

pub struct WeatherCheck {
  store: Arc<MockStore>,
}

impl WeatherCheck {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl StepHandler for WeatherCheck {
  #[instrument(name = "WeatherCheck::handle", skip_all, fields(city = input.get_str("destination_city")))]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let city = input.get_str("destination_city").unwrap_or("Unknown");

    let envelope = match self.store.weather(city) {
      Some(report) if report.reroute_required => Envelope::success()
        .with_reason(format!("Weather alert detected in {}. Rerouting delivery.", city))
        .with_update("weather", json!({"alert": report.alert, "advice": report.advice}))
        .with_update("reroute_reason", "weather")
        .with_flag(Signal::RequireReroute),
      Some(report) => Envelope::success()
        .with_reason(format!("Weather is clear in {}. No reroute required.", city))
        .with_update("weather", json!({"alert": report.alert})),
      None => Envelope::success().with_reason(format!("No weather data for {}.", city)),
    };
    timed(envelope, started)
  }
}

/// Applies or blocks a customer's change request against the change rules.
pub struct CustomerChange;

impl CustomerChange {
  fn rule(rules: Option<&serde_json::Map<String, Value>>, key: &str, default: f64) -> f64 {
    rules.and_then(|r| r.get(key)).and_then(Value::as_f64).unwrap_or(default)
  }
}

#[async_trait]
impl StepHandler for CustomerChange {
  #[instrument(name = "CustomerChange::handle", skip_all)]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let Some(request) = input.get_object("request").filter(|r| !r.is_empty()) else {
      return timed(Envelope::success().with_reason("No customer change requested."), started);
    };
    let kind = request.get("type").and_then(Value::as_str).unwrap_or("other");
    let payload = request.get("payload").and_then(Value::as_object);

    let rules = input.get_object("policy_change_rules");
    let cutoff_min = Self::rule(rules, "cutoff_min", 10.0);
    let max_km = Self::rule(rules, "max_km_address_change", 5.0);
    let fee_flat = Self::rule(rules, "fee_flat", 0.0);
    let minutes_to_drop = input
      .get_object("courier_position")
      .and_then(|p| p.get("minutes_to_drop"))
      .and_then(Value::as_f64);
    let past_cutoff = minutes_to_drop.map_or(false, |m| m < cutoff_min);

    let blocked = match kind {
      "address" => {
        let moved_km = payload
          .and_then(|p| p.get("distance_km"))
          .and_then(Value::as_f64)
          .unwrap_or(0.0);
        (past_cutoff || moved_km > max_km).then(|| format!("Address change of {:.1} km is not allowed now.", moved_km))
      }
      "cancel" => past_cutoff.then(|| "Cancellation window has closed.".to_string()),
      _ => None,
    };

    let envelope = match blocked {
      Some(reason) => Envelope::success()
        .with_reason(reason)
        .with_update("customer_change", json!({"type": kind, "status": "rejected"}))
        .with_flag(Signal::PolicyBlock),
      None => {
        let fee = if kind == "address" || kind == "cancel" { fee_flat } else { 0.0 };
        let mut envelope = Envelope::success()
          .with_reason(format!("Customer {} change applied.", kind))
          .with_update("customer_change", json!({"type": kind, "status": "applied"}))
          .with_update("change_fees", fee)
          .with_flag(Signal::ChangeApplied);
        if kind == "cancel" {
          envelope = envelope.with_update("notify_event", "cancelled");
        }
        envelope
      }
    };
    timed(envelope, started)
  }
}
