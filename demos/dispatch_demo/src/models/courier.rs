// baton/demos/dispatch_demo/src/models/courier.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub lat: f64,
  pub lng: f64,
}

impl GeoPoint {
  pub const fn new(lat: f64, lng: f64) -> Self {
    Self { lat, lng }
  }

  /// Equirectangular approximation; good enough inside one city.
  pub fn distance_km(&self, other: &GeoPoint) -> f64 {
    let mean_lat = ((self.lat + other.lat) / 2.0).to_radians();
    let d_lat = (other.lat - self.lat).to_radians();
    let d_lng = (other.lng - self.lng).to_radians() * mean_lat.cos();
    6371.0 * (d_lat * d_lat + d_lng * d_lng).sqrt()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCapacity {
  Small,
  Medium,
  Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourierStatus {
  Available,
  EnRouteToPickup,
  Delivering,
  Stuck,
  Offline,
}

impl CourierStatus {
  pub fn can_take_order(&self) -> bool {
    matches!(self, CourierStatus::Available | CourierStatus::EnRouteToPickup)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Courier {
  pub id: String,
  pub reputation_score: f64,
  pub vehicle_capacity: VehicleCapacity,
  pub status: CourierStatus,
  pub location: GeoPoint,
}
