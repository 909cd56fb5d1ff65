// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use baton::{Envelope, HandlerRegistry, OrderContext, Phase, PhaseInput, UnknownSignalPolicy};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Atomic counter for checking execution counts across tests (use with #[serial]) ---
pub static HANDLER_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  HANDLER_EXEC_COUNTER.store(0, Ordering::SeqCst);
}

/// Phases visited by a run plus the inputs each handler saw, in call order.
#[derive(Clone, Default)]
pub struct Trace {
  inner: Arc<Mutex<Vec<PhaseInput>>>,
}

impl Trace {
  pub fn record(&self, input: &PhaseInput) {
    self.inner.lock().push(input.clone());
  }

  pub fn phases(&self) -> Vec<Phase> {
    self.inner.lock().iter().map(|input| input.phase).collect()
  }

  pub fn input_for(&self, phase: Phase) -> Option<PhaseInput> {
    self.inner.lock().iter().find(|input| input.phase == phase).cloned()
  }
}

/// Registers a handler on every phase. Phases in `script` return their scripted envelope,
/// the rest return an empty success. Every call is recorded in the returned trace and
/// bumps `HANDLER_EXEC_COUNTER`.
pub fn scripted_registry(script: HashMap<Phase, Envelope>) -> (HandlerRegistry, Trace) {
  let trace = Trace::default();
  let script = Arc::new(script);
  let mut registry = HandlerRegistry::new();
  for phase in Phase::ALL {
    let trace = trace.clone();
    let script = script.clone();
    registry.on(phase, move |input: PhaseInput| {
      trace.record(&input);
      HANDLER_EXEC_COUNTER.fetch_add(1, Ordering::SeqCst);
      let envelope = script.get(&input.phase).cloned().unwrap_or_else(Envelope::success);
      async move { envelope }
    });
  }
  (registry, trace)
}

pub fn script(entries: Vec<(Phase, Envelope)>) -> HashMap<Phase, Envelope> {
  entries.into_iter().collect()
}

pub fn order(doc: Value) -> OrderContext {
  OrderContext::from_value(doc, UnknownSignalPolicy::Warn).expect("test order must be a valid context")
}

/// A representative initial order, shaped like the demo application's.
pub fn sample_order() -> OrderContext {
  order(serde_json::json!({
    "order_id": "order_12345",
    "merchant_id": "M123",
    "items": [
      {"sku": "MILK-1L", "qty": 1, "vol_l": 1.0, "is_bulky": false},
      {"sku": "WATER-20L", "qty": 1, "vol_l": 20.0, "is_bulky": true}
    ],
    "payment": {"transactions": [{"id": "t1"}]},
    "order_total": 249.0,
    "user_prefs": {"payment_priority": "wallet"},
    "pickup_location": {"lat": 40.73, "lng": -73.99, "city": "New York"},
    "drop_location": {"lat": 40.76, "lng": -73.98, "city": "New York"},
    "readiness_eta_min": 5,
    "priority_flag": true,
    "courier": {"id": "courier_C"},
    "sla_eta_min": 30,
    "credits": 50.0
  }))
}
