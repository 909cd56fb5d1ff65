// baton/demos/dispatch_demo/src/handlers/courier.rs

//! Everything that touches courier assignment: initial dispatch, the reputation gate,
//! vehicle capacity, split negotiation, breakdown detection and reassignment.

use crate::handlers::{geo_point, string_list, timed};
use crate::models::{Courier, CourierStatus, ItemSize, VehicleCapacity};
use crate::services::MockStore;
use async_trait::async_trait;
use baton::{Envelope, PhaseInput, Signal, StepHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Average courier speed in town, 24 km/h.
const KM_PER_MIN: f64 = 0.4;
/// Radius in which priority orders go to the best-rated courier instead of the nearest.
const PRIORITY_RADIUS_KM: f64 = 5.0;
/// Couriers below this score are reassigned.
pub const MIN_REPUTATION: f64 = 0.5;
/// Idle minutes at zero speed before a courier counts as stuck.
const IDLE_LIMIT_MIN: f64 = 10.0;
/// Extra travel time for a weather detour.
const DETOUR_MIN: i64 = 8;

fn rounded(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

pub struct Dispatcher {
  store: Arc<MockStore>,
}

impl Dispatcher {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }

  fn pick<'a>(candidates: &'a [(Courier, f64)], priority: bool) -> Option<&'a (Courier, f64)> {
    let nearest = candidates.first();
    if !priority {
      return nearest;
    }
    candidates
      .iter()
      .filter(|(_, km)| *km <= PRIORITY_RADIUS_KM)
      .max_by(|(a, _), (b, _)| a.reputation_score.total_cmp(&b.reputation_score))
      .or(nearest)
  }
}

#[async_trait]
impl StepHandler for Dispatcher {
  #[instrument(name = "Dispatcher::handle", skip_all, fields(priority = input.get_bool("priority_flag")))]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let Some(pickup) = geo_point(input.get_object("pickup_location")) else {
      return timed(Envelope::failure("Pickup location has no coordinates."), started);
    };
    let dropoff = geo_point(input.get_object("drop_location")).unwrap_or(pickup);
    let readiness = input.get_f64("readiness_eta_min").unwrap_or(0.0);
    let priority = input.get_bool("priority_flag").unwrap_or(false);

    let mut candidates: Vec<(Courier, f64)> = self
      .store
      .couriers()
      .into_iter()
      .filter(|courier| courier.status.can_take_order())
      .map(|courier| {
        let km = courier.location.distance_km(&pickup);
        (courier, km)
      })
      .collect();
    candidates.sort_by(|(_, a), (_, b)| a.total_cmp(b));

    let Some((courier, to_pickup_km)) = Self::pick(&candidates, priority) else {
      return timed(
        Envelope::failure("No courier is available.").with_update("notify_event", "no_courier"),
        started,
      );
    };

    let trip_km = to_pickup_km + pickup.distance_km(&dropoff);
    let eta_min = (readiness + trip_km / KM_PER_MIN).ceil() as i64;
    let pool: Vec<&str> = candidates.iter().map(|(c, _)| c.id.as_str()).collect();
    let backups: Vec<&str> = pool.iter().copied().filter(|id| *id != courier.id).collect();

    self.store.set_courier_status(&courier.id, CourierStatus::EnRouteToPickup);
    info!(courier_id = %courier.id, eta_min, "Courier dispatched.");

    timed(
      Envelope::success()
        .with_reason(format!("Dispatched {} with an ETA of {} min.", courier.id, eta_min))
        .with_update(
          "courier",
          json!({"id": courier.id, "vehicle_capacity": courier.vehicle_capacity, "status": "en_route_to_pickup"}),
        )
        .with_update("route", json!({"eta_min": eta_min, "distance_km": rounded(trip_km)}))
        .with_update("courier_pool", json!(pool))
        .with_update("candidate_pool", json!(backups))
        .with_flag(Signal::OnRoute),
      started,
    )
  }
}

pub struct ReputationGate {
  store: Arc<MockStore>,
}

impl ReputationGate {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl StepHandler for ReputationGate {
  #[instrument(name = "ReputationGate::handle", skip_all, fields(courier_id = input.get_str("courier_candidate_id")))]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let Some(courier_id) = input.get_str("courier_candidate_id") else {
      return timed(Envelope::failure("No courier candidate to vet."), started);
    };

    // Fresh KPIs win over the fleet record.
    let score = input
      .get_object("historical_kpis")
      .and_then(|kpis| kpis.get("reputation_score"))
      .and_then(Value::as_f64)
      .or_else(|| self.store.courier(courier_id).map(|c| c.reputation_score));

    let envelope = match score {
      None => Envelope::failure(format!("Courier {} has no reputation record.", courier_id))
        .with_update("reroute_reason", "unknown_courier")
        .with_flag(Signal::ReassignCourier),
      Some(score) if score < MIN_REPUTATION => Envelope::success()
        .with_reason(format!(
          "Courier {} has a low reputation score. Reassignment recommended.",
          courier_id
        ))
        .with_update("risk", json!({"level": "high", "score": score}))
        .with_update("reroute_reason", "low_reputation")
        .with_flag(Signal::ReassignCourier),
      Some(score) => Envelope::success()
        .with_reason(format!("Courier {} has an acceptable reputation score.", courier_id))
        .with_update("risk", json!({"level": "low", "score": score})),
    };
    timed(envelope, started)
  }
}

pub struct CapacityCheck {
  store: Arc<MockStore>,
}

impl CapacityCheck {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl StepHandler for CapacityCheck {
  #[instrument(name = "CapacityCheck::handle", skip_all)]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let courier_id = input.get_str("courier_id").unwrap_or_default();
    let Some(courier) = self.store.courier(courier_id) else {
      return timed(Envelope::failure(format!("Courier '{}' is unknown.", courier_id)), started);
    };
    let items = self.store.order_items(input.get_str("order_id").unwrap_or_default());
    let bulky: Vec<&str> = items
      .iter()
      .filter(|item| item.size == ItemSize::Bulky)
      .map(|item| item.item_id.as_str())
      .collect();

    let envelope = if courier.vehicle_capacity == VehicleCapacity::Small && !bulky.is_empty() {
      Envelope::success()
        .with_reason(format!("Courier {}'s small vehicle cannot fit a bulky item.", courier.id))
        .with_update("capacity", json!({"fits": false, "overflow_items": bulky}))
        .with_flag(Signal::ProposeSplitDelivery)
    } else {
      Envelope::success()
        .with_reason(format!("Order fits within courier {}'s vehicle capacity.", courier.id))
        .with_update("capacity", json!({"fits": true, "items": items.len()}))
    };
    timed(envelope, started)
  }
}

pub struct SplitNegotiation {
  store: Arc<MockStore>,
  default_response: Option<String>,
}

impl SplitNegotiation {
  pub fn new(store: Arc<MockStore>, default_response: Option<String>) -> Self {
    Self { store, default_response }
  }
}

#[async_trait]
impl StepHandler for SplitNegotiation {
  #[instrument(name = "SplitNegotiation::handle", skip_all)]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let response = input
      .get_str("customer_response")
      .or(self.default_response.as_deref())
      .unwrap_or("disagree");
    let split_allowed = input
      .get_object("policy_split_rules")
      .and_then(|rules| rules.get("allowed"))
      .and_then(Value::as_bool)
      .unwrap_or(true);
    debug!(%response, split_allowed, "Negotiating split delivery.");

    let envelope = if split_allowed && response.eq_ignore_ascii_case("agree") {
      let overflow = string_list(input.get("overflow_items"));
      let first: Vec<String> = self
        .store
        .order_items(input.get_str("order_id").unwrap_or_default())
        .into_iter()
        .map(|item| item.item_id)
        .filter(|id| !overflow.contains(id))
        .collect();
      Envelope::success()
        .with_reason("Customer agreed to split delivery. Creating two separate deliveries.")
        .with_update("delivery_plan", "split")
        .with_update(
          "split_plan",
          json!({"first_delivery_items": first, "second_delivery_items": overflow}),
        )
        .with_flag(Signal::SplitSuccessful)
        .with_flag(Signal::SpawnSecondDispatch)
    } else {
      Envelope::success()
        .with_reason("Customer declined split delivery. Finding a new courier.")
        .with_update("delivery_plan", "single")
        .with_flag(Signal::FindNewCourier)
    };
    timed(envelope, started)
  }
}

pub struct BreakdownDetector {
  store: Arc<MockStore>,
}

impl BreakdownDetector {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }
}

#[async_trait]
impl StepHandler for BreakdownDetector {
  #[instrument(name = "BreakdownDetector::handle", skip_all, fields(courier_id = input.get_str("courier_id")))]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let courier_id = input.get_str("courier_id").unwrap_or_default();
    let telemetry = input.get_object("telemetry");
    let reading = |key: &str| telemetry.and_then(|t| t.get(key)).and_then(Value::as_f64);

    let sos = telemetry
      .and_then(|t| t.get("sos_flag"))
      .and_then(Value::as_bool)
      .unwrap_or(false);
    let idle = reading("speed") == Some(0.0) && reading("idle_min").unwrap_or(0.0) >= IDLE_LIMIT_MIN;
    let stuck = self
      .store
      .courier(courier_id)
      .map_or(false, |courier| courier.status == CourierStatus::Stuck);

    let envelope = if sos || idle || stuck {
      self.store.set_courier_status(courier_id, CourierStatus::Stuck);
      Envelope::success()
        .with_reason(format!("Courier {} has broken down. Finding a backup courier.", courier_id))
        .with_update("courier_status", "broken_down")
        .with_update("reroute_reason", "breakdown")
        .with_flag(Signal::NeedBackupCourier)
    } else {
      Envelope::success()
        .with_reason(format!("Courier {} is en route without issues.", courier_id))
        .with_update("courier_status", "en_route")
    };
    timed(envelope, started)
  }
}

pub struct Rerouter {
  store: Arc<MockStore>,
}

impl Rerouter {
  pub fn new(store: Arc<MockStore>) -> Self {
    Self { store }
  }

  fn best_backup(&self, current: Option<&str>, pool: &[String]) -> Option<Courier> {
    let candidates = if pool.is_empty() {
      self.store.couriers()
    } else {
      pool.iter().filter_map(|id| self.store.courier(id)).collect()
    };
    candidates
      .into_iter()
      .filter(|c| Some(c.id.as_str()) != current)
      .filter(|c| c.status.can_take_order() && c.reputation_score >= MIN_REPUTATION)
      .max_by(|a, b| a.reputation_score.total_cmp(&b.reputation_score))
  }
}

#[async_trait]
impl StepHandler for Rerouter {
  #[instrument(name = "Rerouter::handle", skip_all, fields(reason = input.get_str("reason")))]
  async fn handle(&self, input: PhaseInput) -> Envelope {
    let started = Instant::now();
    let reason = input.get_str("reason").unwrap_or("risk");
    let current = input.get_str("current_courier");

    if reason == "weather" {
      let advice = input.get_str("weather_advice").unwrap_or("Avoid flooded streets");
      return timed(
        Envelope::success()
          .with_reason(format!("Keeping {} on a detour: {}.", current.unwrap_or("courier"), advice))
          .with_update("route", json!({"advice": advice, "detour_min": DETOUR_MIN}))
          .with_flag(Signal::RerouteDone),
        started,
      );
    }

    let pool = string_list(input.get("candidate_pool"));
    let Some(backup) = self.best_backup(current, &pool) else {
      return timed(
        Envelope::failure(format!("No eligible backup courier ({}).", reason)).with_update("notify_event", "delayed"),
        started,
      );
    };

    self.store.set_courier_status(&backup.id, CourierStatus::EnRouteToPickup);
    info!(from = ?current, to = %backup.id, %reason, "Courier reassigned.");
    timed(
      Envelope::success()
        .with_reason(format!("Reassigned order to {} ({}).", backup.id, reason))
        .with_update(
          "courier",
          json!({
            "id": backup.id,
            "previous_id": current,
            "vehicle_capacity": backup.vehicle_capacity,
            "status": "en_route_to_pickup"
          }),
        )
        .with_flag(Signal::RerouteDone),
      started,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use baton::Phase;
  use serde_json::Map;

  fn input(phase: Phase, doc: Value) -> PhaseInput {
    let fields: Map<String, Value> = doc.as_object().cloned().unwrap_or_default();
    PhaseInput::new(phase, fields)
  }

  #[tokio::test]
  async fn breakdown_on_sos() {
    let store = Arc::new(MockStore::seeded());
    let detector = BreakdownDetector::new(store.clone());
    let envelope = detector
      .handle(input(
        Phase::Breakdown,
        json!({"courier_id": "courier_A", "telemetry": {"sos_flag": true}}),
      ))
      .await;
    assert!(envelope.signals.contains_key(&Signal::NeedBackupCourier));
    assert_eq!(store.courier("courier_A").unwrap().status, CourierStatus::Stuck);
  }

  #[tokio::test]
  async fn short_idle_is_not_a_breakdown() {
    let detector = BreakdownDetector::new(Arc::new(MockStore::seeded()));
    let envelope = detector
      .handle(input(
        Phase::Breakdown,
        json!({"courier_id": "courier_A", "telemetry": {"speed": 0, "idle_min": 3}}),
      ))
      .await;
    assert!(envelope.signals.is_empty());
    assert_eq!(envelope.updates["courier_status"], json!("en_route"));
  }

  #[tokio::test]
  async fn reroute_without_backup_fails_without_signal() {
    let store = Arc::new(MockStore::seeded());
    store.set_courier_status("courier_A", CourierStatus::Offline);
    let rerouter = Rerouter::new(store);
    let envelope = rerouter
      .handle(input(Phase::Reroute, json!({"current_courier": "courier_C", "reason": "breakdown"})))
      .await;
    assert!(!envelope.ok);
    assert!(!envelope.signals.contains_key(&Signal::RerouteDone));
  }

  #[tokio::test]
  async fn declined_split_asks_for_a_new_courier() {
    let negotiation = SplitNegotiation::new(Arc::new(MockStore::seeded()), None);
    let envelope = negotiation
      .handle(input(Phase::Split, json!({"order_id": "order_12345", "overflow_items": ["item_3"]})))
      .await;
    assert_eq!(envelope.updates["delivery_plan"], json!("single"));
    assert!(envelope.signals.contains_key(&Signal::FindNewCourier));
  }
}
