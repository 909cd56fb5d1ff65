// baton/src/router.rs

//! The phase router: a pure function of the current phase and the accumulated signals.
//!
//! | phase           | condition                | next            |
//! |-----------------|--------------------------|-----------------|
//! | (none run yet)  |                          | payment         |
//! | payment         |                          | merchant        |
//! | merchant        | `needs_alt_sourcing`     | notify          |
//! | merchant        | else                     | dispatch        |
//! | dispatch        | `on_route`               | reputation      |
//! | dispatch        | else                     | notify          |
//! | reputation      | `reassign_courier`       | reroute         |
//! | reputation      | else                     | capacity        |
//! | capacity        | `propose_split_delivery` | split           |
//! | capacity        | else                     | weather         |
//! | split           |                          | weather         |
//! | weather         | `require_reroute`        | reroute         |
//! | weather         | else                     | breakdown       |
//! | breakdown       | `need_backup_courier`    | reroute         |
//! | breakdown       | else                     | customer_change |
//! | reroute         | `reroute_done`           | customer_change |
//! | reroute         | else                     | notify          |
//! | customer_change |                          | policy          |
//! | policy          |                          | notify          |
//! | notify          |                          | audit           |
//! | audit           |                          | terminal        |
//!
//! `Envelope::ok` plays no part in routing: a failed step still routes on whatever
//! signals it (and earlier steps) produced.

use crate::core::control::Transition;
use crate::core::phase::Phase;
use crate::core::signal::{signal_flag, Signal, SignalMap};
use std::str::FromStr;
use tracing::{event, Level};

/// Signature of a routing table. The orchestrator uses [`route`] unless told otherwise.
pub type RouteFn = dyn Fn(Option<Phase>, &SignalMap) -> Transition + Send + Sync;

/// Computes the next phase. `None` means no phase has run yet.
pub fn route(phase: Option<Phase>, signals: &SignalMap) -> Transition {
  let flag = |signal: Signal| signal_flag(signals, signal);
  let branch = |signal: Signal, then: Phase, otherwise: Phase| {
    if flag(signal) {
      then
    } else {
      otherwise
    }
  };

  let Some(phase) = phase else {
    return Transition::Next(Phase::Payment);
  };

  let next = match phase {
    Phase::Payment => Phase::Merchant,
    Phase::Merchant => branch(Signal::NeedsAltSourcing, Phase::Notify, Phase::Dispatch),
    Phase::Dispatch => branch(Signal::OnRoute, Phase::Reputation, Phase::Notify),
    Phase::Reputation => branch(Signal::ReassignCourier, Phase::Reroute, Phase::Capacity),
    Phase::Capacity => branch(Signal::ProposeSplitDelivery, Phase::Split, Phase::Weather),
    Phase::Split => Phase::Weather,
    Phase::Weather => branch(Signal::RequireReroute, Phase::Reroute, Phase::Breakdown),
    Phase::Breakdown => branch(Signal::NeedBackupCourier, Phase::Reroute, Phase::CustomerChange),
    Phase::Reroute => branch(Signal::RerouteDone, Phase::CustomerChange, Phase::Notify),
    Phase::CustomerChange => Phase::Policy,
    Phase::Policy => Phase::Notify,
    Phase::Notify => Phase::Audit,
    Phase::Audit => return Transition::Terminal,
  };
  Transition::Next(next)
}

/// [`route`] for a free-form phase name.
///
/// An empty name means no phase has run yet. A name outside [`Phase`] is a routing anomaly:
/// it routes to terminal and is reported at WARN, since it means the caller's phase names
/// and the table disagree.
pub fn route_name(phase: &str, signals: &SignalMap) -> Transition {
  if phase.is_empty() {
    return route(None, signals);
  }
  match Phase::from_str(phase) {
    Ok(known) => route(Some(known), signals),
    Err(_) => {
      event!(Level::WARN, phase = %phase, "Routing anomaly: unrecognized phase, treating as terminal.");
      Transition::Terminal
    }
  }
}
