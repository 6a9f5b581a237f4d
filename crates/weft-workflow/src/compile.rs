use std::time::Duration;

use weft_config::{BackoffDef, BranchDef, JoinModeDef, LoopDef, ParallelDef, RetryDef};
use weft_config::{StepDef, StepType, SubFlowDef, WorkflowDef};

use crate::error::CompileError;
use crate::retry::{Backoff, RetryPolicy};
use crate::step::{Branch, JoinMode, LoopSpec, ParallelSpec, Step, StepKind, SubFlowSpec};
use crate::workflow::Workflow;

/// Compile a validated definition into the executable model.
///
/// Validation runs first, so a definition that loads through `weft-config`
/// and one passed directly both reject with the same descriptive errors.
pub fn compile(def: &WorkflowDef) -> Result<Workflow, CompileError> {
  weft_config::validate(def)?;

  let steps = def
    .workflow
    .iter()
    .map(compile_step)
    .collect::<Result<Vec<_>, _>>()?;

  Ok(Workflow {
    name: def.name.clone(),
    event: def.on.event.clone(),
    steps,
  })
}

fn compile_step(def: &StepDef) -> Result<Step, CompileError> {
  let kind = match def.step_type {
    StepType::Action => StepKind::Action {
      action: def.action.clone().unwrap_or_default(),
      config: def
        .config
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
    },
    StepType::Condition => StepKind::Condition {
      condition: def.condition.clone().unwrap_or_default(),
    },
    StepType::Delay => {
      let raw = def.duration.as_deref().ok_or_else(|| CompileError::MissingField {
        step: def.name.clone(),
        field: "duration",
      })?;
      StepKind::Delay {
        duration: parse_duration(&def.name, "duration", raw)?,
      }
    }
    StepType::Parallel => {
      let parallel = def.parallel.as_ref().ok_or_else(|| CompileError::MissingField {
        step: def.name.clone(),
        field: "parallel",
      })?;
      StepKind::Parallel(compile_parallel(&def.name, parallel)?)
    }
    StepType::Subflow => {
      let sub = def.sub_workflow.as_ref().ok_or_else(|| CompileError::MissingField {
        step: def.name.clone(),
        field: "sub_workflow",
      })?;
      StepKind::SubFlow(compile_subflow(&def.name, sub)?)
    }
    StepType::Loop => {
      let looped = def.r#loop.as_ref().ok_or_else(|| CompileError::MissingField {
        step: def.name.clone(),
        field: "loop",
      })?;
      StepKind::Loop(compile_loop(looped)?)
    }
  };

  Ok(Step {
    name: def.name.clone(),
    condition: def.r#if.clone(),
    retry: def
      .retry
      .as_ref()
      .map(|r| compile_retry(&def.name, r))
      .transpose()?,
    timeout: def
      .timeout
      .as_deref()
      .map(|t| parse_duration(&def.name, "timeout", t))
      .transpose()?,
    on_success: def.on_success.clone(),
    on_failure: def.on_failure.clone(),
    kind,
  })
}

fn compile_retry(step: &str, def: &RetryDef) -> Result<RetryPolicy, CompileError> {
  let defaults = RetryPolicy::default();
  Ok(RetryPolicy {
    max_attempts: def.max,
    delay: def
      .delay
      .as_deref()
      .map(|d| parse_duration(step, "retry.delay", d))
      .transpose()?
      .unwrap_or(defaults.delay),
    backoff: match def.backoff {
      BackoffDef::Fixed => Backoff::Fixed,
      BackoffDef::Linear => Backoff::Linear,
      BackoffDef::Exponential => Backoff::Exponential,
      BackoffDef::Random => Backoff::Random,
    },
    max_delay: def
      .max_delay
      .as_deref()
      .map(|d| parse_duration(step, "retry.max_delay", d))
      .transpose()?,
  })
}

fn compile_parallel(step: &str, def: &ParallelDef) -> Result<ParallelSpec, CompileError> {
  let branches = def
    .branches
    .iter()
    .map(|b| compile_branch(b))
    .collect::<Result<Vec<_>, _>>()?;

  Ok(ParallelSpec {
    branches,
    join: match def.join {
      JoinModeDef::All => JoinMode::All,
      JoinModeDef::Any => JoinMode::Any,
      JoinModeDef::First => JoinMode::First,
      JoinModeDef::Custom => JoinMode::Custom,
    },
    timeout: def
      .timeout
      .as_deref()
      .map(|t| parse_duration(step, "parallel.timeout", t))
      .transpose()?,
    fail_fast: def.fail_fast,
    max_parallel: def.max_parallel.max(0) as usize,
  })
}

fn compile_branch(def: &BranchDef) -> Result<Branch, CompileError> {
  Ok(Branch {
    id: def.id.clone(),
    name: def.name.clone(),
    condition: def.condition.clone(),
    variables: def.variables.clone(),
    steps: def
      .steps
      .iter()
      .map(compile_step)
      .collect::<Result<Vec<_>, _>>()?,
  })
}

fn compile_subflow(step: &str, def: &SubFlowDef) -> Result<SubFlowSpec, CompileError> {
  Ok(SubFlowSpec {
    workflow: def.workflow.clone(),
    input: def.input.clone(),
    output: def.output.clone(),
    run_async: def.run_async,
    timeout: def
      .timeout
      .as_deref()
      .map(|t| parse_duration(step, "sub_workflow.timeout", t))
      .transpose()?,
    variables: def.variables.clone(),
  })
}

fn compile_loop(def: &LoopDef) -> Result<LoopSpec, CompileError> {
  Ok(LoopSpec {
    condition: def.condition.clone(),
    max_iterations: def.max_iterations,
    steps: def
      .steps
      .iter()
      .map(compile_step)
      .collect::<Result<Vec<_>, _>>()?,
  })
}

fn parse_duration(step: &str, field: &'static str, value: &str) -> Result<Duration, CompileError> {
  humantime::parse_duration(value).map_err(|e| CompileError::InvalidDuration {
    step: step.to_string(),
    field,
    value: value.to_string(),
    message: e.to_string(),
  })
}
