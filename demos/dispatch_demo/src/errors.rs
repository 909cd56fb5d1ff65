// baton/demos/dispatch_demo/src/errors.rs

use baton::BatonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Order file could not be read: {0}")]
  Io(#[from] std::io::Error),

  #[error("Order document is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from] // Allows conversion from baton::BatonError
    source: BatonError,
  },

  #[error("Run was cancelled before the workflow finished.")]
  Cancelled,
}

impl AppError {
  /// Process exit code for this failure.
  pub fn exit_code(&self) -> i32 {
    match self {
      AppError::Config(_) => 2,
      AppError::Workflow { source } if source.is_configuration() => 2,
      AppError::Cancelled => 130,
      _ => 1,
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
