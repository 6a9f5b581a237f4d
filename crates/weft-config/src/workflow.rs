use serde::{Deserialize, Serialize};

use crate::step::StepDef;

/// A complete workflow definition as loaded from a YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub name: String,
  pub on: TriggerDef,
  pub workflow: Vec<StepDef>,
}

/// What triggers the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
  pub event: String,
}
