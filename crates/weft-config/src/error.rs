use thiserror::Error;

/// Errors raised while loading or validating a workflow definition.
#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("failed to read workflow file: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse workflow YAML: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("workflow name is required")]
  MissingName,

  #[error("workflow trigger event is required")]
  MissingEvent,

  #[error("workflow must have at least one step")]
  NoSteps,

  #[error("step {index}: name is required")]
  MissingStepName { index: usize },

  #[error("step {index} ({name}): action is required")]
  MissingAction { index: usize, name: String },

  #[error("step {index} ({name}): retry.max must be >= 1")]
  RetryMax { index: usize, name: String },

  #[error("step {index} ({name}): {message}")]
  InvalidStep {
    index: usize,
    name: String,
    message: String,
  },
}
