// baton/demos/dispatch_demo/src/handlers/fulfilment.rs

use crate::handlers::timed;
use crate::services::MockStore;
use async_trait::async_trait;
use baton::{Envelope, PhaseInput, Signal, StepHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Reconciles the order's payment against the gateway and refunds duplicate charges.
pub struct PaymentCheck {
  store: Arc<MockStore>,
}

impl PaymentCheck {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl StepHandler for PaymentCheck {
  #[instrument(name = "PaymentCheck::handle", skip_all)]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let tx_ids: Vec<&str> = input
      .get_object("payment")
      .and_then(|payment| payment.get("transactions"))
      .and_then(Value::as_array)
      .map(|txs| txs.iter().filter_map(|tx| tx.get("id").and_then(Value::as_str)).collect())
      .unwrap_or_default();

    let Some((order_id, record)) = tx_ids.iter().find_map(|id| self.store.payment_for_transaction(id)) else {
      info!("No gateway record for this payment.");
      return timed(
        Envelope::success()
          .with_reason("No gateway record for this payment; nothing to reconcile.")
          .with_update("payment", json!({"status": "unverified"})),
        started,
      );
    };

    if record.confirmed_charges() <= 1 || record.refunded() {
      return timed(
        Envelope::success()
          .with_reason("No double charge detected.")
          .with_update("payment", json!({"status": "captured"})),
        started,
      );
    }

    let Some(refund) = self.store.refund_duplicate_charge(&order_id) else {
      warn!(%order_id, "Gateway record vanished before the refund.");
      return timed(Envelope::failure(format!("Refund for {} could not be recorded.", order_id)), started);
    };

    let mut envelope = Envelope::success()
      .with_reason(format!("Detected double charge for {}. Auto-refund initiated.", order_id))
      .with_update(
        "payment",
        json!({
          "status": "refund_in_progress",
          "total_transactions": record.transactions.len(),
          "refund": {"id": refund.id, "amount": refund.amount}
        }),
      )
      .with_flag(Signal::IssueDetected)
      .with_flag(Signal::RefundInitiated);

    // Wallet-first customers get the refund as store credit.
    let wallet_first = input
      .get_object("user_prefs")
      .and_then(|prefs| prefs.get("payment_priority"))
      .and_then(Value::as_str)
      == Some("wallet");
    if wallet_first {
      envelope = envelope.with_update("credits", json!({"credit_delta": refund.amount, "source": "refund"}));
    }
    if let Some(total) = input.get_f64("order_total") {
      envelope = envelope.with_metric("order_total", total);
    }
    timed(envelope, started)
  }
}

/// Confirms the merchant is open and stocks every item.
pub struct MerchantCheck {
  store: Arc<MockStore>,
}

impl MerchantCheck {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl StepHandler for MerchantCheck {
  #[instrument(name = "MerchantCheck::handle", skip_all, fields(merchant_id = input.get_str("merchant_id")))]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let merchant_id = input.get_str("merchant_id").unwrap_or_default();

    let Some(merchant) = self.store.merchant(merchant_id) else {
      return timed(
        Envelope::failure(format!("Merchant '{}' is unknown.", merchant_id))
          .with_update("notify_event", "merchant_unavailable")
          .with_flag(Signal::NeedsAltSourcing),
        started,
      );
    };

    if !merchant.open {
      return timed(
        Envelope::success()
          .with_reason(format!("Merchant {} is closed; sourcing elsewhere.", merchant.id))
          .with_update("merchant", json!({"status": "closed"}))
          .with_update("notify_event", "merchant_unavailable")
          .with_flag(Signal::NeedsAltSourcing),
        started,
      );
    }

    let items = input.get_array("items").map(Vec::as_slice).unwrap_or_default();
    let missing: Vec<&str> = items
      .iter()
      .filter_map(|item| item.get("sku").and_then(Value::as_str))
      .filter(|sku| !merchant.in_stock.contains(*sku))
      .collect();

    let envelope = if missing.is_empty() {
      Envelope::success()
        .with_reason(format!("Merchant {} has all {} items.", merchant.id, items.len()))
        .with_update("merchant", json!({"status": "ready", "checked_items": items.len()}))
    } else {
      Envelope::success()
        .with_reason(format!("Merchant {} is out of {}.", merchant.id, missing.join(", ")))
        .with_update("merchant", json!({"status": "partial", "missing_skus": missing}))
        .with_update("notify_event", "alt_sourcing")
        .with_flag(Signal::NeedsAltSourcing)
    };
    timed(envelope, started)
  }
}
