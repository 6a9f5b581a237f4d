use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::enums::{BackoffDef, JoinModeDef, StepType};

/// A single step in a workflow definition.
///
/// Any key that is not one of the recognized fields lands in `config` and
/// becomes part of the action's input after template resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub name: String,
  #[serde(rename = "type", default)]
  pub step_type: StepType,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub action: Option<String>,
  /// Gating template: when it resolves falsy the step is recorded skipped.
  #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
  pub r#if: Option<String>,
  /// Condition template for `condition` and `loop` steps.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry: Option<RetryDef>,
  /// Bound on the whole step, retries included (humantime string).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parallel: Option<ParallelDef>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sub_workflow: Option<SubFlowDef>,
  /// Sleep duration for `delay` steps (humantime string).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration: Option<String>,
  #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
  pub r#loop: Option<LoopDef>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub on_success: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub on_failure: Vec<String>,
  #[serde(flatten)]
  pub config: HashMap<String, serde_json::Value>,
}

/// Retry behavior for a step. `max` is the total attempt cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryDef {
  pub max: u32,
  #[serde(default)]
  pub backoff: BackoffDef,
  /// Base delay between attempts (humantime string, default 1s).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delay: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_delay: Option<String>,
}

/// Configuration of a `parallel` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelDef {
  pub branches: Vec<BranchDef>,
  #[serde(default)]
  pub join: JoinModeDef,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout: Option<String>,
  #[serde(default)]
  pub fail_fast: bool,
  /// Concurrency cap; zero or negative means unbounded.
  #[serde(default)]
  pub max_parallel: i64,
}

/// One branch of a parallel step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDef {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  /// Variable overlay; the branch context is parent variables plus these.
  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub variables: serde_json::Map<String, serde_json::Value>,
  pub steps: Vec<StepDef>,
}

/// Configuration of a `subflow` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubFlowDef {
  /// Name of the target workflow.
  pub workflow: String,
  /// sub-variable <- parent-variable projections.
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub input: HashMap<String, String>,
  /// parent-variable <- sub-variable projections applied after completion.
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub output: HashMap<String, String>,
  #[serde(rename = "async", default)]
  pub run_async: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout: Option<String>,
  /// Static variables layered over the projected inputs.
  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub variables: serde_json::Map<String, serde_json::Value>,
}

/// Configuration of a `loop` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDef {
  pub condition: String,
  pub max_iterations: u32,
  pub steps: Vec<StepDef>,
}
