use thiserror::Error;

use weft_actions::ActionError;
use weft_store::StoreError;
use weft_template::TemplateError;

/// Errors that can occur during workflow execution.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Template(#[from] TemplateError),

  /// A step references an action the registry does not know.
  #[error("unknown action '{action}' in step '{step}'")]
  UnknownAction { step: String, action: String },

  #[error(transparent)]
  Action(ActionError),

  /// A step, parallel region, or sub-workflow exceeded its bound.
  #[error("step '{step}' timed out")]
  Timeout { step: String },

  #[error("execution cancelled")]
  Cancelled,

  #[error("persistence error: {0}")]
  Store(#[from] StoreError),

  #[error("instance not found: {0}")]
  InstanceNotFound(String),

  #[error("workflow not found: {0}")]
  WorkflowNotFound(String),

  #[error("branch '{branch}' failed: {message}")]
  BranchFailed { branch: String, message: String },

  /// Terminal failure of an instance; the id is preserved so callers can
  /// still inspect the persisted record.
  #[error("workflow failed at step '{step}': {message}")]
  StepFailed {
    instance_id: String,
    step: String,
    message: String,
  },

  #[error("task join error: {0}")]
  Join(String),
}

impl From<ActionError> for EngineError {
  fn from(err: ActionError) -> Self {
    match err {
      ActionError::Cancelled => EngineError::Cancelled,
      other => EngineError::Action(other),
    }
  }
}
