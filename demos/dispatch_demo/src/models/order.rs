// baton/demos/dispatch_demo/src/models/order.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
  Confirmed,
  Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
  pub id: String,
  pub amount: f64,
  pub status: TransactionStatus,
}

/// What the payment gateway knows about one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
  pub customer_id: String,
  pub amount: f64,
  pub transactions: Vec<Transaction>,
}

impl PaymentRecord {
  pub fn confirmed_charges(&self) -> usize {
    self
      .transactions
      .iter()
      .filter(|tx| tx.status == TransactionStatus::Confirmed)
      .count()
  }

  pub fn refunded(&self) -> bool {
    self.transactions.iter().any(|tx| tx.status == TransactionStatus::Refunded)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSize {
  Small,
  Bulky,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
  pub item_id: String,
  pub size: ItemSize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
  pub id: String,
  pub open: bool,
  pub in_stock: BTreeSet<String>,
}
