// tests/orchestrator_tests.rs
mod common;

use baton::{
  BatonError, CancellationToken, ContextData, Envelope, HandlerRegistry, Orchestrator, OrchestratorConfig, Phase,
  PhaseInput, RunResult, Signal, Transition, DEFAULT_MAX_STEPS,
};
use common::*;
use serde_json::json;
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_alt_sourcing_skips_dispatch() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![(
    Phase::Merchant,
    Envelope::success().with_flag(Signal::NeedsAltSourcing),
  )]));
  let orchestrator = Orchestrator::new(registry);

  let ctx = orchestrator.execute(sample_order()).await.unwrap();

  assert_eq!(
    trace.phases(),
    vec![Phase::Payment, Phase::Merchant, Phase::Notify, Phase::Audit]
  );
  assert_eq!(ctx.audit().len(), 4);
  assert_eq!(ctx.phase(), Some(Phase::Audit));
}

#[tokio::test]
async fn test_split_negotiation_returns_to_weather() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![
    (Phase::Dispatch, Envelope::success().with_flag(Signal::OnRoute)),
    (Phase::Capacity, Envelope::success().with_flag(Signal::ProposeSplitDelivery)),
    (Phase::Split, Envelope::failure("customer declined")),
  ]));
  let orchestrator = Orchestrator::new(registry);

  orchestrator.execute(sample_order()).await.unwrap();

  assert_eq!(
    trace.phases(),
    vec![
      Phase::Payment,
      Phase::Merchant,
      Phase::Dispatch,
      Phase::Reputation,
      Phase::Capacity,
      Phase::Split,
      Phase::Weather,
      Phase::Breakdown,
      Phase::CustomerChange,
      Phase::Policy,
      Phase::Notify,
      Phase::Audit,
    ]
  );
}

#[tokio::test]
async fn test_reroute_path_and_audit_labels() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![
    (Phase::Dispatch, Envelope::success().with_flag(Signal::OnRoute)),
    (
      Phase::Weather,
      Envelope::success()
        .with_flag(Signal::RequireReroute)
        .with_update("reroute_reason", "storm"),
    ),
    (
      Phase::Reroute,
      Envelope::success()
        .with_flag(Signal::RerouteDone)
        .with_update("courier", json!({"id": "courier_B"})),
    ),
  ]));
  let orchestrator = Orchestrator::new(registry);

  let ctx = orchestrator.execute(sample_order()).await.unwrap();

  let phases = trace.phases();
  assert_eq!(
    phases,
    vec![
      Phase::Payment,
      Phase::Merchant,
      Phase::Dispatch,
      Phase::Reputation,
      Phase::Capacity,
      Phase::Weather,
      Phase::Reroute,
      Phase::CustomerChange,
      Phase::Policy,
      Phase::Notify,
      Phase::Audit,
    ]
  );

  // One entry per step, tagged with the phase and its label.
  assert_eq!(ctx.audit().len(), phases.len());
  for (entry, phase) in ctx.audit().iter().zip(&phases) {
    assert_eq!(entry.phase, Some(*phase));
    assert_eq!(entry.thought.as_deref(), Some(phase.thought()));
  }

  let reroute_input = trace.input_for(Phase::Reroute).unwrap();
  assert_eq!(reroute_input.get_str("reason"), Some("storm"));
  assert_eq!(reroute_input.get_str("current_courier"), Some("courier_C"));
  // The reroute merge replaced `id` inside the existing courier object.
  assert_eq!(ctx.get("courier"), Some(&json!({"id": "courier_B"})));
}

#[tokio::test]
async fn test_handlers_receive_only_their_projection() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![(
    Phase::Dispatch,
    Envelope::success().with_flag(Signal::OnRoute),
  )]));
  Orchestrator::new(registry).execute(sample_order()).await.unwrap();

  let payment = trace.input_for(Phase::Payment).unwrap();
  let keys: Vec<&str> = payment.fields.keys().map(String::as_str).collect();
  assert_eq!(keys, vec!["payment", "order_total", "user_prefs"]);

  let reputation = trace.input_for(Phase::Reputation).unwrap();
  assert_eq!(reputation.get_str("courier_candidate_id"), Some("courier_C"));
  assert!(reputation.get("historical_kpis").is_none());
  assert!(reputation.get("signals").is_none());

  let weather = trace.input_for(Phase::Weather).unwrap();
  assert_eq!(weather.get_str("courier_location"), Some("New York"));
  assert_eq!(weather.get_str("destination_city"), Some("New York"));
}

#[tokio::test]
async fn test_audit_handler_sees_trail_summary() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![
    (Phase::Payment, Envelope::success().with_reason("charged wallet").with_update("payment", json!({"status": "captured"}))),
    (Phase::Merchant, Envelope::success().with_flag(Signal::NeedsAltSourcing)),
    (Phase::Notify, Envelope::success().with_reason("").with_update("notify", json!({"sent": true}))),
  ]));
  Orchestrator::new(registry).execute(sample_order()).await.unwrap();

  let audit_input = trace.input_for(Phase::Audit).unwrap();
  assert_eq!(audit_input.get("thoughts"), Some(&json!(["charged wallet"])));
  assert_eq!(audit_input.get("events"), Some(&json!(["payment", "none", "notify"])));
  let state = audit_input.get_object("state_diff").unwrap();
  // Audit itself has not been merged yet.
  assert_eq!(state["_phase"], json!("notify"));
  assert_eq!(state["signals"], json!({"needs_alt_sourcing": true}));
  assert_eq!(state["audit"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_failed_step_still_routes_by_default() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![(
    Phase::Payment,
    Envelope::failure("gateway timeout").with_flag(Signal::IssueDetected),
  )]));
  let ctx = Orchestrator::new(registry).execute(sample_order()).await.unwrap();

  assert_eq!(trace.phases()[1], Phase::Merchant);
  let first = &ctx.audit()[0];
  assert!(!first.ok);
  assert_eq!(first.reason.as_deref(), Some("gateway timeout"));
  assert_eq!(ctx.signals()[&Signal::IssueDetected], json!(true));
}

#[tokio::test]
async fn test_fail_on_handler_error_aborts_after_merge() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![(
    Phase::Merchant,
    Envelope::failure("merchant closed").with_update("merchant", json!({"open": false})),
  )]));
  let orchestrator =
    Orchestrator::new(registry).with_config(OrchestratorConfig::default().with_fail_on_handler_error(true));
  let ctx_data = ContextData::new(sample_order());

  let err = orchestrator.run(ctx_data.clone()).await.unwrap_err();

  match err {
    BatonError::StepFailed { phase, reason } => {
      assert_eq!(phase, Phase::Merchant);
      assert_eq!(reason, "merchant closed");
    }
    other => panic!("expected StepFailed, got {:?}", other),
  }
  assert_eq!(trace.phases(), vec![Phase::Payment, Phase::Merchant]);
  let ctx = ctx_data.read();
  assert_eq!(ctx.audit().len(), 2);
  assert_eq!(ctx.get("merchant"), Some(&json!({"open": false})));
}

#[tokio::test]
async fn test_missing_handler_is_a_configuration_error() {
  setup_tracing();
  let mut registry = HandlerRegistry::new();
  registry.on(Phase::Payment, |_input: PhaseInput| async { Envelope::success() });
  let orchestrator = Orchestrator::new(registry);

  match orchestrator.validate() {
    Err(BatonError::HandlerMissing { phase }) => assert_eq!(phase, Phase::Merchant),
    other => panic!("expected HandlerMissing from validate, got {:?}", other),
  }

  let ctx_data = ContextData::new(sample_order());
  let err = orchestrator.run(ctx_data.clone()).await.unwrap_err();
  assert!(err.is_configuration());
  assert!(matches!(err, BatonError::HandlerMissing { phase: Phase::Merchant }));
  // The payment merge survives; the stamp names the last merged phase.
  let ctx = ctx_data.read();
  assert_eq!(ctx.audit().len(), 1);
  assert_eq!(ctx.phase(), Some(Phase::Payment));
}

#[tokio::test]
async fn test_rerun_after_missing_handler_runs_the_failed_phase() {
  setup_tracing();
  let mut partial = HandlerRegistry::new();
  partial.on(Phase::Payment, |_input: PhaseInput| async { Envelope::success() });
  let ctx_data = ContextData::new(sample_order());

  let err = Orchestrator::new(partial).run(ctx_data.clone()).await.unwrap_err();
  assert!(matches!(err, BatonError::HandlerMissing { phase: Phase::Merchant }));

  let (full, trace) = scripted_registry(script(vec![]));
  let result = Orchestrator::new(full).run(ctx_data.clone()).await.unwrap();

  assert_eq!(result, RunResult::Completed);
  assert_eq!(trace.phases(), vec![Phase::Merchant, Phase::Dispatch, Phase::Notify, Phase::Audit]);
  let audit_phases: Vec<_> = ctx_data.read().audit().iter().map(|entry| entry.phase).collect();
  assert_eq!(
    audit_phases,
    vec![Some(Phase::Payment), Some(Phase::Merchant), Some(Phase::Dispatch), Some(Phase::Notify), Some(Phase::Audit)]
  );
}

#[tokio::test]
async fn test_missing_handler_reported_before_projection() {
  setup_tracing();
  let mut registry = HandlerRegistry::new();
  registry
    .on(Phase::Payment, |_input: PhaseInput| async {
      Envelope::success().with_update("courier", "x")
    })
    .on(Phase::Merchant, |_input: PhaseInput| async { Envelope::success() })
    .on(Phase::Dispatch, |_input: PhaseInput| async {
      Envelope::success().with_flag(Signal::OnRoute)
    });

  let err = Orchestrator::new(registry).execute(sample_order()).await.unwrap_err();

  // The reputation projection would trip on the scalar courier, but the missing handler wins.
  match err {
    BatonError::HandlerMissing { phase } => assert_eq!(phase, Phase::Reputation),
    other => panic!("expected HandlerMissing(reputation), got {:?}", other),
  }
}

#[tokio::test]
async fn test_projection_through_scalar_aborts_run() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![(
    Phase::Dispatch,
    Envelope::success().with_flag(Signal::OnRoute),
  )]));
  let mut doc = sample_order().to_value();
  doc["courier"] = json!("courier_C");
  doc.as_object_mut().unwrap().remove("audit");
  doc.as_object_mut().unwrap().remove("_phase");

  let err = Orchestrator::new(registry).execute_value(doc).await.unwrap_err();

  match err {
    BatonError::Projection { phase, path, found } => {
      assert_eq!(phase, Phase::Reputation);
      assert_eq!(path, "courier");
      assert_eq!(found, "a string");
    }
    other => panic!("expected Projection, got {:?}", other),
  }
  assert_eq!(trace.phases(), vec![Phase::Payment, Phase::Merchant, Phase::Dispatch]);
}

#[tokio::test]
#[serial]
async fn test_cyclic_router_hits_step_limit() {
  setup_tracing();
  reset_counters();
  let (registry, _trace) = scripted_registry(script(vec![]));
  let orchestrator = Orchestrator::new(registry).with_router(|phase, _signals| match phase {
    None | Some(Phase::Merchant) => Transition::Next(Phase::Payment),
    Some(_) => Transition::Next(Phase::Merchant),
  });

  let err = orchestrator.execute(sample_order()).await.unwrap_err();

  assert!(matches!(err, BatonError::RunawayLoop { max_steps } if max_steps == DEFAULT_MAX_STEPS));
  assert_eq!(HANDLER_EXEC_COUNTER.load(Ordering::SeqCst), DEFAULT_MAX_STEPS);
}

#[tokio::test]
#[serial]
async fn test_step_limit_is_configurable() {
  setup_tracing();
  reset_counters();
  let (registry, trace) = scripted_registry(script(vec![]));
  let orchestrator = Orchestrator::new(registry).with_config(OrchestratorConfig::default().with_max_steps(3));

  // The default happy path needs five steps.
  let err = orchestrator.execute(sample_order()).await.unwrap_err();
  assert!(matches!(err, BatonError::RunawayLoop { max_steps: 3 }));
  assert_eq!(trace.phases(), vec![Phase::Payment, Phase::Merchant, Phase::Dispatch]);
  assert_eq!(HANDLER_EXEC_COUNTER.load(Ordering::SeqCst), 3);

  let (registry, _trace) = scripted_registry(script(vec![]));
  let orchestrator = Orchestrator::new(registry).with_config(OrchestratorConfig::default().with_max_steps(5));
  let ctx = orchestrator.execute(sample_order()).await.unwrap();
  assert_eq!(ctx.audit().len(), 5);
}

#[tokio::test]
async fn test_cancellation_between_steps_then_resume() {
  setup_tracing();
  let token = CancellationToken::new();
  let trace = Trace::default();
  let mut registry = HandlerRegistry::new();
  for phase in Phase::ALL {
    let trace = trace.clone();
    let token = token.clone();
    registry.on(phase, move |input: PhaseInput| {
      trace.record(&input);
      if input.phase == Phase::Merchant {
        token.cancel();
      }
      async { Envelope::success().with_update("touched", true) }
    });
  }
  let orchestrator = Orchestrator::new(registry);
  let ctx_data = ContextData::new(sample_order());

  let first = orchestrator
    .run_with_cancellation(ctx_data.clone(), token.clone())
    .await
    .unwrap();
  assert_eq!(first, RunResult::Cancelled);
  assert_eq!(trace.phases(), vec![Phase::Payment, Phase::Merchant]);
  {
    let ctx = ctx_data.read();
    // The in-flight step finished and was merged.
    assert_eq!(ctx.audit().len(), 2);
    assert_eq!(ctx.phase(), Some(Phase::Merchant));
  }

  // A second run picks up after the stamped phase.
  let second = orchestrator.run(ctx_data.clone()).await.unwrap();
  assert_eq!(second, RunResult::Completed);
  assert_eq!(
    trace.phases(),
    vec![Phase::Payment, Phase::Merchant, Phase::Dispatch, Phase::Notify, Phase::Audit]
  );
  assert_eq!(ctx_data.read().audit().len(), 5);
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![]));
  let token = CancellationToken::new();
  token.cancel();

  let (result, ctx) = Orchestrator::new(registry)
    .execute_with_cancellation(sample_order(), token)
    .await
    .unwrap();

  assert_eq!(result, RunResult::Cancelled);
  assert!(trace.phases().is_empty());
  assert!(ctx.audit().is_empty());
  assert_eq!(ctx.phase(), None);
}

#[tokio::test]
async fn test_execute_value_seeds_signals_and_renders_snapshot() {
  setup_tracing();
  let (registry, trace) = scripted_registry(script(vec![]));
  let orchestrator = Orchestrator::new(registry);

  let mut doc = sample_order().to_value();
  let obj = doc.as_object_mut().unwrap();
  obj.remove("audit");
  obj.remove("_phase");
  obj.insert("signals".to_string(), json!({"on_route": true}));

  let out = orchestrator.execute_value(doc).await.unwrap();

  // A seeded routing signal steers the run like one emitted by a handler.
  assert_eq!(trace.phases()[3], Phase::Reputation);
  assert_eq!(out["_phase"], json!("audit"));
  assert_eq!(out["order_id"], json!("order_12345"));
  assert_eq!(out["signals"], json!({"on_route": true}));
  assert_eq!(out["audit"].as_array().map(Vec::len), Some(trace.phases().len()));
}

#[tokio::test]
async fn test_execute_value_rejects_non_object() {
  setup_tracing();
  let (registry, _trace) = scripted_registry(script(vec![]));
  let err = Orchestrator::new(registry).execute_value(json!([1, 2])).await.unwrap_err();
  assert!(err.is_configuration());
}

#[tokio::test]
async fn test_orchestrator_is_shareable_across_tasks() {
  setup_tracing();
  let (registry, _trace) = scripted_registry(script(vec![]));
  let orchestrator = Arc::new(Orchestrator::new(registry));

  let mut handles = Vec::new();
  for i in 0..4 {
    let orchestrator = orchestrator.clone();
    handles.push(tokio::spawn(async move {
      let ctx = order(json!({"order_id": format!("order_{}", i)}));
      orchestrator.execute(ctx).await
    }));
  }
  for (i, handle) in handles.into_iter().enumerate() {
    let ctx = handle.await.unwrap().unwrap();
    assert_eq!(ctx.get("order_id"), Some(&json!(format!("order_{}", i))));
    assert_eq!(ctx.audit().len(), 5);
  }
}
