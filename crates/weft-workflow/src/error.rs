use thiserror::Error;

use weft_config::ValidationError;

/// Errors raised while compiling a definition into the executable model.
#[derive(Debug, Error)]
pub enum CompileError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("step '{step}': invalid {field} '{value}': {message}")]
  InvalidDuration {
    step: String,
    field: &'static str,
    value: String,
    message: String,
  },

  #[error("step '{step}': missing {field}")]
  MissingField { step: String, field: &'static str },
}
