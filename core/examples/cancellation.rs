// baton/examples/cancellation.rs

use baton::{
  BatonResult, CancellationToken, ContextData, Envelope, HandlerRegistry, Orchestrator, OrderContext, Phase,
  PhaseInput, RunResult, Signal,
};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> BatonResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Cancellation Example ---");

  // Each step takes a while, like a real service call would.
  let mut registry = HandlerRegistry::new();
  for phase in Phase::ALL {
    registry.on(phase, |input: PhaseInput| async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      let envelope = Envelope::success().with_reason(format!("{} done", input.phase));
      if input.phase == Phase::Dispatch {
        envelope.with_flag(Signal::OnRoute)
      } else {
        envelope
      }
    });
  }
  let orchestrator = Orchestrator::new(registry);

  let ctx_data = ContextData::new(OrderContext::default());
  let token = CancellationToken::new();

  // Ask for cancellation while the second step is in flight.
  let canceller = token.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(75)).await;
    canceller.cancel();
  });

  let result = orchestrator.run_with_cancellation(ctx_data.clone(), token).await?;
  assert_eq!(result, RunResult::Cancelled);
  {
    let ctx = ctx_data.read();
    info!(stopped_after = ?ctx.phase(), steps = ctx.audit().len(), "First run cancelled.");
  }

  // Running the same context again resumes after the last completed phase.
  let result = orchestrator.run(ctx_data.clone()).await?;
  let steps = ctx_data.read().audit().len();
  info!(?result, steps, "Second run finished.");

  Ok(())
}
