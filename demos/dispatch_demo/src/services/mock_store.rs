// baton/demos/dispatch_demo/src/services/mock_store.rs

//! In-memory stand-ins for the payment gateway, courier fleet, merchant catalogue, weather
//! service, notification outbox and audit store the handlers talk to.

use crate::models::{
  Courier, CourierStatus, GeoPoint, ItemSize, Merchant, OrderItem, PaymentRecord, Transaction, TransactionStatus,
  VehicleCapacity, WeatherReport,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
  pub event: String,
  pub targets: Vec<String>,
  pub payload: Value,
  pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
  pub id: Uuid,
  pub order_id: Option<String>,
  pub thoughts: Vec<String>,
  pub events: Vec<String>,
  pub snapshot: Value,
  pub persisted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreData {
  payments: HashMap<String, PaymentRecord>,
  couriers: HashMap<String, Courier>,
  merchants: HashMap<String, Merchant>,
  order_items: HashMap<String, Vec<OrderItem>>,
  weather: HashMap<String, WeatherReport>,
  outbox: Vec<Notification>,
  audit_records: Vec<AuditRecord>,
}

#[derive(Debug, Default)]
pub struct MockStore {
  inner: RwLock<StoreData>,
}

impl MockStore {
  /// The demo data set: one double-charged order, three couriers around Manhattan, a
  /// storm over New York.
  pub fn seeded() -> Self {
    let mut data = StoreData::default();

    data.payments.insert(
      "order_12345".to_string(),
      PaymentRecord {
        customer_id: "cust_987".to_string(),
        amount: 25.50,
        transactions: vec![
          Transaction {
            id: "tx_abc".to_string(),
            amount: 25.50,
            status: TransactionStatus::Confirmed,
          },
          Transaction {
            id: "tx_def".to_string(),
            amount: 25.50,
            status: TransactionStatus::Confirmed,
          },
        ],
      },
    );

    for (id, reputation_score, vehicle_capacity, status, location) in [
      (
        "courier_A",
        0.85,
        VehicleCapacity::Large,
        CourierStatus::Available,
        GeoPoint::new(40.7128, -74.0060),
      ),
      (
        "courier_B",
        0.30,
        VehicleCapacity::Small,
        CourierStatus::EnRouteToPickup,
        GeoPoint::new(40.7306, -73.9995),
      ),
      (
        "courier_C",
        0.95,
        VehicleCapacity::Medium,
        CourierStatus::EnRouteToPickup,
        GeoPoint::new(40.7580, -73.9855),
      ),
    ] {
      data.couriers.insert(
        id.to_string(),
        Courier {
          id: id.to_string(),
          reputation_score,
          vehicle_capacity,
          status,
          location,
        },
      );
    }

    data.merchants.insert(
      "M123".to_string(),
      Merchant {
        id: "M123".to_string(),
        open: true,
        in_stock: ["MILK-1L", "BREAD", "WATER-20L"].into_iter().map(String::from).collect(),
      },
    );

    data.order_items.insert(
      "order_12345".to_string(),
      vec![
        OrderItem {
          item_id: "item_1".to_string(),
          size: ItemSize::Small,
        },
        OrderItem {
          item_id: "item_2".to_string(),
          size: ItemSize::Small,
        },
        OrderItem {
          item_id: "item_3".to_string(),
          size: ItemSize::Bulky,
        },
      ],
    );

    data.weather.insert(
      "New York".to_string(),
      WeatherReport {
        alert: Some("severe_rain_warning".to_string()),
        reroute_required: true,
        advice: Some("Route via I-95 South".to_string()),
      },
    );
    data.weather.insert(
      "Los Angeles".to_string(),
      WeatherReport {
        alert: None,
        reroute_required: false,
        advice: None,
      },
    );

    Self {
      inner: RwLock::new(data),
    }
  }

  /// Finds the gateway record holding `tx_id`, with its order id.
  pub fn payment_for_transaction(&self, tx_id: &str) -> Option<(String, PaymentRecord)> {
    self
      .inner
      .read()
      .payments
      .iter()
      .find(|(_, record)| record.transactions.iter().any(|tx| tx.id == tx_id))
      .map(|(order_id, record)| (order_id.clone(), record.clone()))
  }

  /// Appends a refund for one charge of `order_id`. Returns `None` for an unknown order.
  #[instrument(skip(self))]
  pub fn refund_duplicate_charge(&self, order_id: &str) -> Option<Transaction> {
    let mut data = self.inner.write();
    let record = data.payments.get_mut(order_id)?;
    let refund = Transaction {
      id: format!("tx_refund_{}", Uuid::new_v4().simple()),
      amount: record.amount,
      status: TransactionStatus::Refunded,
    };
    record.transactions.push(refund.clone());
    info!(refund_id = %refund.id, amount = refund.amount, "Refund recorded at the gateway.");
    Some(refund)
  }

  pub fn merchant(&self, merchant_id: &str) -> Option<Merchant> {
    self.inner.read().merchants.get(merchant_id).cloned()
  }

  pub fn courier(&self, courier_id: &str) -> Option<Courier> {
    self.inner.read().couriers.get(courier_id).cloned()
  }

  /// Every courier, sorted by id.
  pub fn couriers(&self) -> Vec<Courier> {
    let mut couriers: Vec<Courier> = self.inner.read().couriers.values().cloned().collect();
    couriers.sort_by(|a, b| a.id.cmp(&b.id));
    couriers
  }

  pub fn set_courier_status(&self, courier_id: &str, status: CourierStatus) {
    if let Some(courier) = self.inner.write().couriers.get_mut(courier_id) {
      courier.status = status;
    }
  }

  pub fn order_items(&self, order_id: &str) -> Vec<OrderItem> {
    self.inner.read().order_items.get(order_id).cloned().unwrap_or_default()
  }

  pub fn weather(&self, city: &str) -> Option<WeatherReport> {
    self.inner.read().weather.get(city).cloned()
  }

  pub fn send_notification(&self, notification: Notification) {
    info!(event = %notification.event, targets = ?notification.targets, "Notification queued.");
    self.inner.write().outbox.push(notification);
  }

  pub fn outbox(&self) -> Vec<Notification> {
    self.inner.read().outbox.clone()
  }

  pub fn persist_audit(&self, record: AuditRecord) -> Uuid {
    let id = record.id;
    self.inner.write().audit_records.push(record);
    id
  }

  pub fn audit_records(&self) -> Vec<AuditRecord> {
    self.inner.read().audit_records.clone()
  }
}
