// baton/demos/dispatch_demo/src/handlers/policy.rs

use crate::handlers::timed;
use async_trait::async_trait;
use baton::{Envelope, PhaseInput, Signal, StepHandler};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::instrument;

const DEFAULT_SLA_MIN: f64 = 30.0;
/// Credits granted when the ETA misses the SLA.
const LATE_COMPENSATION: f64 = 5.0;

/// Object keys upstream handlers use when they write a balance or delta as an object.
const AMOUNT_KEYS: [&str; 5] = ["wallet_delta", "credit_delta", "amount", "balance", "value"];

fn number_like(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
}

/// Reads an amount leniently: a number, a numeric string, or an object carrying one of
/// [`AMOUNT_KEYS`] (first usable key wins). Anything else yields `default`.
pub fn as_float(value: Option<&Value>, default: f64) -> f64 {
  match value {
    Some(Value::Object(map)) => AMOUNT_KEYS
      .iter()
      .find_map(|key| map.get(*key).and_then(number_like))
      .unwrap_or(default),
    Some(other) => number_like(other).unwrap_or(default),
    None => default,
  }
}

/// Checks the ETA against the SLA and extra charges against available credits.
pub struct PolicyGuard;

#[async_trait]
impl StepHandler for PolicyGuard {
  #[instrument(name = "PolicyGuard::handle", skip_all)]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let eta_min = as_float(input.get("eta_min"), 0.0);
    let sla_eta_min = as_float(input.get("sla_eta_min"), DEFAULT_SLA_MIN);
    let price_delta = as_float(input.get("price_delta"), 0.0);
    let credits = as_float(input.get("credits"), 0.0);
    let change_fees = as_float(input.get("change_fees"), 0.0);
    let split_parts = input
      .get_object("split_plan")
      .map_or(1, |plan| plan.values().filter(|v| v.as_array().map_or(false, |a| !a.is_empty())).count().max(1));

    let extra_cost = price_delta + change_fees;
    let sla_breached = eta_min > sla_eta_min;
    let compensation = if sla_breached { LATE_COMPENSATION } else { 0.0 };

    let summary = json!({
      "eta_min": eta_min,
      "sla_eta_min": sla_eta_min,
      "sla_breached": sla_breached,
      "extra_cost": extra_cost,
      "credits_available": credits,
      "compensation_credits": compensation,
      "deliveries": split_parts
    });

    let envelope = if extra_cost > credits {
      Envelope::success()
        .with_reason(format!(
          "Extra cost {:.2} exceeds available credits {:.2}; change held for approval.",
          extra_cost, credits
        ))
        .with_update("policy", summary)
        .with_update("notify_event", "blocked")
        .with_flag(Signal::PolicyBlock)
    } else if sla_breached {
      Envelope::success()
        .with_reason(format!(
          "ETA {} min misses the {} min SLA; granting {} credits.",
          eta_min, sla_eta_min, compensation
        ))
        .with_update("policy", summary)
        .with_update("notify_event", "delayed")
        .with_flag(Signal::PolicyWarn)
    } else {
      Envelope::success()
        .with_reason(format!("Within SLA ({} of {} min) and budget.", eta_min, sla_eta_min))
        .with_update("policy", summary)
    };
    timed(envelope.with_metric("extra_cost", extra_cost), started)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use baton::Phase;

  #[test]
  fn as_float_accepts_numbers_strings_and_amount_objects() {
    assert_eq!(as_float(Some(&json!(249)), 0.0), 249.0);
    assert_eq!(as_float(Some(&json!(" 12.5 ")), 0.0), 12.5);
    assert_eq!(as_float(Some(&json!({"wallet_delta": 249.0, "balance": 10})), 0.0), 249.0);
    assert_eq!(as_float(Some(&json!({"balance": "7.25"})), 0.0), 7.25);
    // Unusable keys are skipped in order.
    assert_eq!(as_float(Some(&json!({"amount": "n/a", "value": 3})), 0.0), 3.0);
  }

  #[test]
  fn as_float_falls_back_to_default() {
    assert_eq!(as_float(None, 1.0), 1.0);
    assert_eq!(as_float(Some(&json!("abc")), 2.0), 2.0);
    assert_eq!(as_float(Some(&json!({"unrelated": 5})), 3.0), 3.0);
    assert_eq!(as_float(Some(&json!([1, 2])), 4.0), 4.0);
    assert_eq!(as_float(Some(&json!(null)), 5.0), 5.0);
  }

  fn policy_input(doc: Value) -> PhaseInput {
    PhaseInput::new(Phase::Policy, doc.as_object().cloned().unwrap_or_default())
  }

  #[tokio::test]
  async fn late_eta_warns_and_compensates() {
    let envelope = PolicyGuard
      .handle(policy_input(json!({"eta_min": 41, "sla_eta_min": 30, "credits": 50.0})))
      .await;
    assert!(envelope.signals.contains_key(&Signal::PolicyWarn));
    assert_eq!(envelope.updates["policy"]["compensation_credits"], json!(5.0));
    assert_eq!(envelope.updates["notify_event"], json!("delayed"));
  }

  #[tokio::test]
  async fn cost_over_credits_blocks() {
    let envelope = PolicyGuard
      .handle(policy_input(json!({
        "eta_min": 20,
        "price_delta": "30",
        "change_fees": 5,
        "credits": {"credit_delta": 25.5, "source": "refund"}
      })))
      .await;
    assert!(envelope.signals.contains_key(&Signal::PolicyBlock));
    assert_eq!(envelope.metrics["extra_cost"], 35.0);
  }

  #[tokio::test]
  async fn split_plan_counts_deliveries() {
    let envelope = PolicyGuard
      .handle(policy_input(json!({
        "eta_min": 20,
        "split_plan": {"first_delivery_items": ["item_1"], "second_delivery_items": ["item_3"]}
      })))
      .await;
    assert!(envelope.signals.is_empty());
    assert_eq!(envelope.updates["policy"]["deliveries"], json!(2));
  }
}
