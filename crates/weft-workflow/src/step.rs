use std::collections::HashMap;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// One element of a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
  pub name: String,
  /// Gating template evaluated before execution; falsy records a skip.
  pub condition: Option<String>,
  pub retry: Option<RetryPolicy>,
  /// Bounds the whole step, retries included.
  pub timeout: Option<Duration>,
  pub on_success: Vec<String>,
  pub on_failure: Vec<String>,
  pub kind: StepKind,
}

/// Tagged step payload; each variant is strongly typed.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
  /// Dispatch to the action registry with templated configuration.
  Action {
    action: String,
    config: serde_json::Map<String, serde_json::Value>,
  },
  Parallel(ParallelSpec),
  SubFlow(SubFlowSpec),
  /// Evaluate a condition and surface the branching targets; no dispatch.
  Condition { condition: String },
  Delay { duration: Duration },
  Loop(LoopSpec),
}

/// Parallel branch execution with a join mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelSpec {
  pub branches: Vec<Branch>,
  pub join: JoinMode,
  /// Bounds the whole parallel region.
  pub timeout: Option<Duration>,
  pub fail_fast: bool,
  /// Concurrency cap; zero means unbounded.
  pub max_parallel: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
  pub id: String,
  pub name: String,
  pub condition: Option<String>,
  /// Overlay merged over the parent variables; the branch wins on conflict.
  pub variables: serde_json::Map<String, serde_json::Value>,
  pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
  /// Wait for every branch.
  All,
  /// Return as soon as one branch produces a non-error result.
  Any,
  /// Return as soon as the first branch succeeds or errors.
  First,
  /// Reserved; executes as `All`.
  Custom,
}

/// Sub-workflow invocation with variable mappings.
#[derive(Debug, Clone, PartialEq)]
pub struct SubFlowSpec {
  /// Name of the target workflow.
  pub workflow: String,
  /// sub-variable <- parent-variable projections.
  pub input: HashMap<String, String>,
  /// parent-variable <- sub-variable projections applied after completion.
  pub output: HashMap<String, String>,
  pub run_async: bool,
  pub timeout: Option<Duration>,
  /// Static variables layered over the projected inputs.
  pub variables: serde_json::Map<String, serde_json::Value>,
}

/// Bounded loop over a body of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpec {
  pub condition: String,
  pub max_iterations: u32,
  pub steps: Vec<Step>,
}
