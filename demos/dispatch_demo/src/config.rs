// baton/demos/dispatch_demo/src/config.rs

use crate::errors::{AppError, Result};
use baton::{OrchestratorConfig, UnknownSignalPolicy, DEFAULT_MAX_STEPS};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

impl FromStr for LogFormat {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pretty" => Ok(LogFormat::Pretty),
      "json" => Ok(LogFormat::Json),
      other => Err(AppError::Config(format!(
        "Invalid BATON_LOG_FORMAT '{}' (expected pretty or json)",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub max_steps: usize,
  pub fail_on_handler_error: bool,
  pub unknown_signals: UnknownSignalPolicy,
  pub log_format: LogFormat,

  // Demo order inputs
  /// Answer to a split-delivery proposal when the order carries none.
  pub customer_response: Option<String>,
  /// JSON file with the initial order. The built-in order is used when unset.
  pub order_file: Option<PathBuf>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      max_steps: DEFAULT_MAX_STEPS,
      fail_on_handler_error: false,
      unknown_signals: UnknownSignalPolicy::default(),
      log_format: LogFormat::Pretty,
      customer_response: None,
      order_file: None,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; unset and blank variables take defaults.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());
    let defaults = Self::default();

    let max_steps = match get_env("BATON_MAX_STEPS") {
      Some(raw) => raw
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::Config(format!("Invalid BATON_MAX_STEPS '{}': expected a positive integer", raw)))?,
      None => defaults.max_steps,
    };

    let fail_on_handler_error = match get_env("BATON_FAIL_ON_HANDLER_ERROR") {
      Some(raw) => raw
        .trim()
        .parse::<bool>()
        .map_err(|e| AppError::Config(format!("Invalid BATON_FAIL_ON_HANDLER_ERROR value: {}", e)))?,
      None => defaults.fail_on_handler_error,
    };

    let unknown_signals = match get_env("BATON_UNKNOWN_SIGNALS") {
      Some(raw) => UnknownSignalPolicy::from_str(&raw).map_err(|e| AppError::Config(e.to_string()))?,
      None => defaults.unknown_signals,
    };

    let log_format = match get_env("BATON_LOG_FORMAT") {
      Some(raw) => raw.parse::<LogFormat>()?,
      None => defaults.log_format,
    };

    let customer_response = get_env("BATON_CUSTOMER_RESPONSE").map(|v| v.trim().to_string());
    let order_file = get_env("BATON_ORDER_FILE").map(PathBuf::from);

    Ok(Self {
      max_steps,
      fail_on_handler_error,
      unknown_signals,
      log_format,
      customer_response,
      order_file,
    })
  }

  pub fn orchestrator_config(&self) -> OrchestratorConfig {
    OrchestratorConfig::default()
      .with_max_steps(self.max_steps)
      .with_fail_on_handler_error(self.fail_on_handler_error)
  }
}
