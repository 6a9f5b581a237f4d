use thiserror::Error;

/// Errors reported by action implementations.
#[derive(Debug, Error)]
pub enum ActionError {
  #[error("{0} parameter is required")]
  MissingParameter(&'static str),

  #[error("invalid {name} parameter: {message}")]
  InvalidParameter {
    name: &'static str,
    message: String,
  },

  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("http request failed with status {status}")]
  HttpStatus { status: u16 },

  #[error("command failed with exit code {exit_code}: {output}")]
  CommandFailed { exit_code: i32, output: String },

  #[error("command timed out after {0:?}")]
  CommandTimeout(std::time::Duration),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error("action cancelled")]
  Cancelled,

  /// Free-form failure reported by a custom action implementation.
  #[error("{0}")]
  Failed(String),
}
