// baton/src/merge.rs

//! The envelope merge engine: the only code path that writes step results into an
//! `OrderContext`.

use crate::core::audit::AuditEntry;
use crate::core::context::{is_reserved_key, OrderContext};
use crate::core::envelope::Envelope;
use serde_json::Value;
use tracing::{event, Level};

/// Folds `envelope` into `ctx` and appends exactly one audit entry.
///
/// - `updates`: object-into-object is merged one level deep, anything else replaces.
///   Reserved keys are skipped.
/// - `signals`: overlaid onto the accumulated map. Nothing is ever removed.
/// - the audit entry records the step's own signals and metrics, the top-level update keys,
///   and `thought` as supplied by the caller.
///
/// A failed envelope (`ok = false`) goes through the same path.
pub fn merge_envelope<'a>(ctx: &'a mut OrderContext, envelope: Envelope, thought: Option<&str>) -> &'a AuditEntry {
  let Envelope {
    ok,
    reason,
    updates,
    signals,
    metrics,
  } = envelope;

  let updates_keys: Vec<String> = updates.keys().cloned().collect();

  for (key, value) in updates {
    if is_reserved_key(&key) {
      event!(Level::WARN, key = %key, phase = ?ctx.phase, "Envelope update targets a reserved key; skipped.");
      continue;
    }
    match value {
      Value::Object(incoming) if matches!(ctx.fields.get(&key), Some(Value::Object(_))) => {
        if let Some(Value::Object(existing)) = ctx.fields.get_mut(&key) {
          for (inner_key, inner_value) in incoming {
            existing.insert(inner_key, inner_value);
          }
        }
      }
      value => {
        ctx.fields.insert(key, value);
      }
    }
  }

  for (signal, value) in &signals {
    ctx.signals.insert(*signal, value.clone());
  }

  event!(
    Level::TRACE,
    ok,
    updates = updates_keys.len(),
    signals = signals.len(),
    "Envelope merged."
  );

  ctx.audit.push(AuditEntry {
    phase: ctx.phase,
    ok,
    reason,
    signals,
    metrics,
    updates_keys,
    thought: thought.map(str::to_string),
  });
  // Just pushed, so the trail is non-empty.
  &ctx.audit[ctx.audit.len() - 1]
}
