// baton/src/core/audit.rs

use crate::core::envelope::Metrics;
use crate::core::phase::Phase;
use crate::core::signal::SignalMap;
use serde::{Deserialize, Serialize};

/// One append-only record per executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
  /// Phase stamped on the context when the envelope was merged.
  pub phase: Option<Phase>,
  pub ok: bool,
  pub reason: Option<String>,
  /// The step's own signals, not the accumulated map.
  pub signals: SignalMap,
  pub metrics: Metrics,
  pub updates_keys: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thought: Option<String>,
}

impl AuditEntry {
  /// `updates_keys` joined by commas, or `"none"` when the step wrote nothing.
  pub fn event_label(&self) -> String {
    if self.updates_keys.is_empty() {
      "none".to_string()
    } else {
      self.updates_keys.join(",")
    }
  }
}
