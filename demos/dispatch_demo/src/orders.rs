// baton/demos/dispatch_demo/src/orders.rs

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use serde_json::{json, Value};

/// The built-in order: a double-charged priority order across Manhattan with one bulky item.
pub fn demo_order() -> Value {
  json!({
    "order_id": "order_12345",
    "merchant_id": "M123",
    "items": [
      {"sku": "MILK-1L", "qty": 1, "vol_l": 1.0, "is_bulky": false},
      {"sku": "BREAD", "qty": 1, "vol_l": 2.0, "is_bulky": false},
      {"sku": "WATER-20L", "qty": 1, "vol_l": 20.0, "is_bulky": true}
    ],
    "payment": {"transactions": [{"id": "tx_abc"}, {"id": "tx_def"}]},
    "order_total": 249.0,
    "user_prefs": {"payment_priority": "wallet"},
    "pickup_location": {"lat": 40.73, "lng": -73.99, "city": "New York"},
    "drop_location": {"lat": 40.76, "lng": -73.98, "city": "New York"},
    "readiness_eta_min": 5,
    "priority_flag": true,

    "sla_eta_min": 30,
    "credits": 50.0,
    "price_delta": 0.0,
    "change_fees": 0.0,
    "customer_change_request": {"type": "payment", "payload": {}},
    "policy_change_rules": {"cutoff_min": 10, "max_km_address_change": 5, "fee_flat": 0.0},
    "telemetry": {"sos_flag": false, "speed": 20}
  })
}

/// Reads the order from `BATON_ORDER_FILE`, or falls back to [`demo_order`].
pub fn load_order(config: &AppConfig) -> Result<Value> {
  let Some(path) = &config.order_file else {
    return Ok(demo_order());
  };
  let raw = std::fs::read_to_string(path)?;
  let order: Value = serde_json::from_str(&raw)?;
  if !order.is_object() {
    return Err(AppError::Config(format!("{} must hold a JSON object", path.display())));
  }
  tracing::info!(path = %path.display(), "Loaded order from file.");
  Ok(order)
}
