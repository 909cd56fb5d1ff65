// baton/demos/dispatch_demo/src/handlers/wrapup.rs

use crate::handlers::{string_list, timed};
use crate::services::{AuditRecord, MockStore, Notification};
use async_trait::async_trait;
use baton::{Envelope, PhaseInput, Signal, StepHandler};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_EVENT: &str = "delivered";
const DEFAULT_TARGETS: [&str; 2] = ["user", "merchant"];

pub struct Notifier {
  store: Arc<MockStore>,
}

impl Notifier {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl StepHandler for Notifier {
  #[instrument(name = "Notifier::handle", skip_all, fields(event = input.get_str("event")))]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let event = input.get_str("event").unwrap_or(DEFAULT_EVENT).to_string();
    let mut targets = string_list(input.get("target"));
    if targets.is_empty() {
      targets = DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect();
    }
    let payload = input.get("payload").cloned().unwrap_or_else(|| json!({}));
    let sent_at = Utc::now();

    self.store.send_notification(Notification {
      event: event.clone(),
      targets: targets.clone(),
      payload,
      sent_at,
    });

    timed(
      Envelope::success()
        .with_reason(format!("Notified {} of '{}'.", targets.join(" and "), event))
        .with_update(
          "notify",
          json!({"event": event, "targets": targets, "sent_at": sent_at.to_rfc3339()}),
        )
        .with_flag(Signal::Notified),
      started,
    )
  }
}

/// Persists the run's trail and final snapshot.
pub struct AuditPersister {
  store: Arc<MockStore>,
}

impl AuditPersister {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl StepHandler for AuditPersister {
  #[instrument(name = "AuditPersister::handle", skip_all)]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let thoughts = string_list(input.get("thoughts"));
    let events = string_list(input.get("events"));
    let snapshot = input.get("state_diff").cloned().unwrap_or(Value::Null);
    let order_id = snapshot.get("order_id").and_then(Value::as_str).map(String::from);

    let record = AuditRecord {
      id: Uuid::new_v4(),
      order_id,
      thoughts,
      events,
      snapshot,
      persisted_at: Utc::now(),
    };
    let steps = record.events.len();
    let id = self.store.persist_audit(record);
    info!(audit_id = %id, steps, "Audit trail persisted.");

    timed(
      Envelope::success()
        .with_reason(format!("Persisted audit trail of {} steps.", steps))
        .with_update("audit_record", json!({"id": id.to_string(), "steps": steps}))
        .with_flag(Signal::AuditPersisted),
      started,
    )
  }
}
