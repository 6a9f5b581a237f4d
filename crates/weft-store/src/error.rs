use thiserror::Error;

/// Errors raised by instance stores.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("instance not found: {0}")]
  NotFound(String),

  #[error("failed to read or write instance: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to serialize instance: {0}")]
  Serde(#[from] serde_json::Error),
}
