use std::path::Path;

use crate::error::ValidationError;
use crate::validate::validate;
use crate::workflow::WorkflowDef;

/// Load and validate a workflow definition from a YAML file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<WorkflowDef, ValidationError> {
  let data = std::fs::read_to_string(path)?;
  load_from_str(&data)
}

/// Load and validate a workflow definition from YAML data.
pub fn load_from_str(data: &str) -> Result<WorkflowDef, ValidationError> {
  let def: WorkflowDef = serde_yaml::from_str(data)?;
  validate(&def)?;
  Ok(def)
}
