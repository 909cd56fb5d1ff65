// baton/demos/dispatch_demo/src/models/weather.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
  pub alert: Option<String>,
  pub reroute_required: bool,
  /// Suggested detour when a reroute is required.
  pub advice: Option<String>,
}
