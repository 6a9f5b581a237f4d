use serde::{Deserialize, Serialize};

/// The kind of a workflow step. Plain action steps omit the `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
  #[default]
  Action,
  Condition,
  Parallel,
  Subflow,
  Delay,
  Loop,
}

/// Retry backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffDef {
  #[default]
  Fixed,
  Linear,
  Exponential,
  Random,
}

/// How parallel branches are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinModeDef {
  #[default]
  All,
  Any,
  First,
  Custom,
}
