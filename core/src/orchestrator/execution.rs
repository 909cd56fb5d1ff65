// baton/src/orchestrator/execution.rs

//! Contains the run loop: look up handler, project input, invoke handler, stamp and merge, route.

use crate::core::context::OrderContext;
use crate::core::context_data::ContextData;
use crate::core::control::{RunResult, Transition};
use crate::core::phase::Phase;
use crate::core::projection::project;
use crate::error::{BatonError, BatonResult};
use crate::merge::merge_envelope;
use crate::orchestrator::definition::Orchestrator;
use serde_json::Value;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{event, instrument, span, Instrument, Level};

impl Orchestrator {
  /// Runs the workflow to completion against `ctx_data`.
  ///
  /// A fresh context starts at payment. A context from an earlier run resumes after the
  /// last phase that was merged into it.
  ///
  /// On error the context keeps every merge completed before the failure; hold a clone of
  /// `ctx_data` to inspect it.
  pub async fn run(&self, ctx_data: ContextData<OrderContext>) -> BatonResult<RunResult> {
    self.run_with_cancellation(ctx_data, CancellationToken::new()).await
  }

  /// Like [`Orchestrator::run`], checking `cancel` before each step. A step already in
  /// flight finishes and is merged.
  #[instrument(
        name = "Orchestrator::run",
        skip_all,
        fields(max_steps = self.config.max_steps, fail_on_handler_error = self.config.fail_on_handler_error),
        err(Display)
    )]
  pub async fn run_with_cancellation(
    &self,
    ctx_data: ContextData<OrderContext>,
    cancel: CancellationToken,
  ) -> BatonResult<RunResult> {
    event!(Level::DEBUG, "Run starting.");

    let mut transition = {
      let ctx = ctx_data.read();
      (self.router)(ctx.phase(), ctx.signals())
    };
    let mut steps = 0usize;

    while let Transition::Next(phase) = transition {
      if steps >= self.config.max_steps {
        event!(Level::ERROR, steps, next = %phase, "Step limit reached.");
        return Err(BatonError::RunawayLoop {
          max_steps: self.config.max_steps,
        });
      }
      if cancel.is_cancelled() {
        event!(Level::INFO, steps, next = %phase, "Run cancelled between steps.");
        return Ok(RunResult::Cancelled);
      }

      let step_span = span!(Level::INFO, "phase_execution", phase = %phase, step_index = steps);
      transition = self.run_step(&ctx_data, phase).instrument(step_span).await?;
      steps += 1;
    }

    event!(Level::DEBUG, steps, "Run completed.");
    Ok(RunResult::Completed)
  }

  async fn run_step(&self, ctx_data: &ContextData<OrderContext>, phase: Phase) -> BatonResult<Transition> {
    let handler = self.registry.lookup(phase).ok_or_else(|| {
      event!(Level::ERROR, "No handler registered for phase.");
      BatonError::HandlerMissing { phase }
    })?;

    let input = {
      let ctx = ctx_data.read();
      project(&ctx, phase).map_err(|err| {
        event!(Level::ERROR, error = %err, "Projection failed.");
        err
      })?
    };

    event!(Level::TRACE, inputs = input.fields.len(), "Invoking handler.");
    let started = Instant::now();
    let envelope = handler.handle(input).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let failure = (!envelope.ok).then(|| {
      envelope
        .reason
        .clone()
        .unwrap_or_else(|| "step reported failure without a reason".to_string())
    });
    if let Some(reason) = &failure {
      event!(Level::WARN, %reason, elapsed_ms, "Handler reported failure.");
    } else {
      event!(Level::DEBUG, elapsed_ms, "Handler succeeded.");
    }

    // Stamp and merge together: a rerun resumes at the first unmerged phase.
    let mut ctx = ctx_data.write();
    ctx.stamp_phase(phase);
    merge_envelope(&mut ctx, envelope, Some(phase.thought()));

    if let Some(reason) = failure {
      if self.config.fail_on_handler_error {
        event!(Level::ERROR, "Aborting run on handler failure.");
        return Err(BatonError::StepFailed { phase, reason });
      }
    }

    let next = (self.router)(Some(phase), ctx.signals());
    event!(Level::DEBUG, %next, "Routed.");
    Ok(next)
  }

  /// Runs a fresh context to completion and hands it back.
  pub async fn execute(&self, initial: OrderContext) -> BatonResult<OrderContext> {
    let (_, ctx) = self.execute_with_cancellation(initial, CancellationToken::new()).await?;
    Ok(ctx)
  }

  /// Runs a fresh context and hands it back with how the run ended.
  pub async fn execute_with_cancellation(
    &self,
    initial: OrderContext,
    cancel: CancellationToken,
  ) -> BatonResult<(RunResult, OrderContext)> {
    let ctx_data = ContextData::new(initial);
    let result = self.run_with_cancellation(ctx_data.clone(), cancel).await?;
    let ctx = ctx_data.into_inner().unwrap_or_else(|shared| shared.snapshot());
    Ok((result, ctx))
  }

  /// JSON in, JSON out: builds the context with the registry's unknown-signal policy and
  /// returns the final snapshot.
  pub async fn execute_value(&self, initial: Value) -> BatonResult<Value> {
    let ctx = OrderContext::from_value(initial, self.registry.unknown_signal_policy())?;
    Ok(self.execute(ctx).await?.to_value())
  }
}
