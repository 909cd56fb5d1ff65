// baton/demos/dispatch_demo/src/handlers/mod.rs

//! Mock step handlers for every dispatch phase, wired against the in-memory store.

use crate::config::AppConfig;
use crate::models::GeoPoint;
use crate::services::MockStore;
use baton::{Envelope, HandlerRegistry, Phase};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

pub mod conditions; // Weather, customer-initiated changes
pub mod courier; // Dispatch, reputation, capacity, split, breakdown, reroute
pub mod fulfilment; // Payment reconciliation, merchant stock
pub mod policy; // SLA and cost guard
pub mod wrapup; // Notifications, audit persistence

/// Builds a registry with a handler for every phase.
pub fn build_registry(store: Arc<MockStore>, config: &AppConfig) -> HandlerRegistry {
  tracing::info!("Registering dispatch handlers...");

  let mut registry = HandlerRegistry::new().with_unknown_signal_policy(config.unknown_signals);
  registry
    .register(Phase::Payment, fulfilment::PaymentCheck::new(store.clone()))
    .register(Phase::Merchant, fulfilment::MerchantCheck::new(store.clone()))
    .register(Phase::Dispatch, courier::Dispatcher::new(store.clone()))
    .register(Phase::Reputation, courier::ReputationGate::new(store.clone()))
    .register(Phase::Capacity, courier::CapacityCheck::new(store.clone()))
    .register(
      Phase::Split,
      courier::SplitNegotiation::new(store.clone(), config.customer_response.clone()),
    )
    .register(Phase::Weather, conditions::WeatherCheck::new(store.clone()))
    .register(Phase::Breakdown, courier::BreakdownDetector::new(store.clone()))
    .register(Phase::Reroute, courier::Rerouter::new(store.clone()))
    .register(Phase::CustomerChange, conditions::CustomerChange)
    .register(Phase::Policy, policy::PolicyGuard)
    .register(Phase::Notify, wrapup::Notifier::new(store.clone()))
    .register(Phase::Audit, wrapup::AuditPersister::new(store));

  tracing::info!(handlers = registry.len(), "All dispatch handlers registered.");
  registry
}

/// Stamps the handler's wall time on the envelope.
pub(crate) fn timed(envelope: Envelope, started: Instant) -> Envelope {
  envelope.with_metric("latency_ms", started.elapsed().as_secs_f64() * 1000.0)
}

pub(crate) fn geo_point(value: Option<&Map<String, Value>>) -> Option<GeoPoint> {
  let map = value?;
  Some(GeoPoint::new(map.get("lat")?.as_f64()?, map.get("lng")?.as_f64()?))
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
  value
    .and_then(Value::as_array)
    .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
    .unwrap_or_default()
}
