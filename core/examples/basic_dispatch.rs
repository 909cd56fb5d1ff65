// baton/examples/basic_dispatch.rs

use baton::{BatonResult, Envelope, HandlerRegistry, Orchestrator, OrderContext, Phase, PhaseInput, Signal, UnknownSignalPolicy};
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> BatonResult<()> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Dispatch Example ---");

  // 1. Every phase needs a handler. Start with a pass-through for all of them...
  let mut registry = HandlerRegistry::new();
  for phase in Phase::ALL {
    registry.on(phase, |input: PhaseInput| async move {
      Envelope::success().with_reason(format!("{} passed", input.phase))
    });
  }

  // 2. ...then override the phases this example cares about.
  registry.on(Phase::Dispatch, |input: PhaseInput| async move {
    let courier_id = if input.get_bool("priority_flag").unwrap_or(false) {
      "courier_A"
    } else {
      "courier_B"
    };
    Envelope::success()
      .with_update("courier", json!({ "id": courier_id }))
      .with_update("route", json!({"eta_min": 18}))
      .with_flag(Signal::OnRoute)
      .with_reason("courier assigned")
  });

  registry.on(Phase::Weather, |input: PhaseInput| async move {
    let city = input.get_str("destination_city").unwrap_or("unknown");
    if city == "Boston" {
      Envelope::success()
        .with_update("weather", json!({"advice": "storm: avoid the bridge"}))
        .with_update("reroute_reason", "weather")
        .with_flag(Signal::RequireReroute)
        .with_reason(format!("storm warning in {}", city))
    } else {
      Envelope::success().with_reason(format!("clear skies in {}", city))
    }
  });

  registry.on(Phase::Reroute, |input: PhaseInput| async move {
    let advice = input.get_str("weather_advice").unwrap_or("none").to_string();
    Envelope::success()
      .with_update("route", json!({"eta_min": 26, "advice": advice}))
      .with_flag(Signal::RerouteDone)
      .with_reason("rerouted")
  });

  // 3. Validate once at startup, then run.
  let orchestrator = Orchestrator::new(registry);
  orchestrator.validate()?;

  let order = OrderContext::from_value(
    json!({
      "order_id": "order_001",
      "pickup_location": {"city": "New York"},
      "drop_location": {"city": "Boston"},
      "priority_flag": true
    }),
    UnknownSignalPolicy::Warn,
  )?;

  let ctx = orchestrator.execute(order).await?;

  // 4. Inspect the trail.
  for entry in ctx.audit() {
    info!(
      phase = ?entry.phase,
      ok = entry.ok,
      reason = entry.reason.as_deref().unwrap_or(""),
      updates = %entry.event_label(),
      "step"
    );
  }
  info!("Final route: {}", ctx.get("route").cloned().unwrap_or_default());

  Ok(())
}
