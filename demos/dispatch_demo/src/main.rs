// baton/demos/dispatch_demo/src/main.rs

// Declare modules for the application
mod config;
mod errors;
mod handlers;
mod models;
mod orders;
mod services;

use crate::config::{AppConfig, LogFormat};
use crate::errors::{AppError, Result as AppResult}; // Use the app's Result alias
use crate::services::MockStore;

use baton::{CancellationToken, Orchestrator, OrderContext, RunResult};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  // RUST_LOG overrides the default level. Logs go to stderr so stdout carries only the snapshot.
  let builder = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .with_writer(std::io::stderr);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[tokio::main]
async fn main() {
  // Load application configuration before logging, since it picks the log format.
  let config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("Failed to load application configuration: {}", e);
      std::process::exit(e.exit_code());
    }
  };
  init_tracing(config.log_format);
  tracing::info!(?config, "Application configuration loaded.");

  if let Err(e) = run(config).await {
    tracing::error!(error = %e, "Dispatch run failed.");
    std::process::exit(e.exit_code());
  }
}

async fn run(config: AppConfig) -> AppResult<()> {
  let store = Arc::new(MockStore::seeded());
  let orchestrator =
    Orchestrator::new(handlers::build_registry(store.clone(), &config)).with_config(config.orchestrator_config());
  orchestrator.validate()?;

  let order = OrderContext::from_value(orders::load_order(&config)?, config.unknown_signals)?;

  // Ctrl-C stops the run between steps; the partial context is still printed.
  let token = CancellationToken::new();
  let ctrl_c_token = token.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("Ctrl-C received; stopping after the current step.");
      ctrl_c_token.cancel();
    }
  });

  tracing::info!("Starting dispatch run...");
  let (result, ctx) = orchestrator.execute_with_cancellation(order, token).await?;

  println!("{}", serde_json::to_string_pretty(&ctx.to_value())?);
  tracing::info!(
    ?result,
    steps = ctx.audit().len(),
    notifications = store.outbox().len(),
    audit_records = store.audit_records().len(),
    "Dispatch run finished."
  );

  match result {
    RunResult::Completed => Ok(()),
    RunResult::Cancelled => Err(AppError::Cancelled),
  }
}
