use thiserror::Error;

/// Errors raised by trigger adapters.
#[derive(Debug, Error)]
pub enum TriggerError {
  #[error("invalid trigger configuration: {0}")]
  InvalidConfig(String),

  #[error("trigger source error: {0}")]
  Source(String),
}
