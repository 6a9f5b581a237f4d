use crate::enums::StepType;
use crate::error::ValidationError;
use crate::step::StepDef;
use crate::workflow::WorkflowDef;

/// Validate a workflow definition, rejecting it with a descriptive error.
pub fn validate(def: &WorkflowDef) -> Result<(), ValidationError> {
  if def.name.is_empty() {
    return Err(ValidationError::MissingName);
  }

  if def.on.event.is_empty() {
    return Err(ValidationError::MissingEvent);
  }

  if def.workflow.is_empty() {
    return Err(ValidationError::NoSteps);
  }

  validate_steps(&def.workflow)
}

fn validate_steps(steps: &[StepDef]) -> Result<(), ValidationError> {
  for (index, step) in steps.iter().enumerate() {
    if step.name.is_empty() {
      return Err(ValidationError::MissingStepName { index });
    }

    if let Some(retry) = &step.retry {
      if retry.max < 1 {
        return Err(ValidationError::RetryMax {
          index,
          name: step.name.clone(),
        });
      }
    }

    match step.step_type {
      StepType::Action => {
        if step.action.as_deref().unwrap_or("").is_empty() {
          return Err(ValidationError::MissingAction {
            index,
            name: step.name.clone(),
          });
        }
      }
      StepType::Condition => {
        if step.condition.as_deref().unwrap_or("").is_empty() {
          return Err(invalid(index, step, "condition is required"));
        }
      }
      StepType::Delay => {
        if step.duration.as_deref().unwrap_or("").is_empty() {
          return Err(invalid(index, step, "duration is required"));
        }
      }
      StepType::Parallel => {
        let parallel = step
          .parallel
          .as_ref()
          .ok_or_else(|| invalid(index, step, "parallel configuration is required"))?;
        if parallel.branches.is_empty() {
          return Err(invalid(index, step, "parallel must have at least one branch"));
        }
        for branch in &parallel.branches {
          if branch.id.is_empty() {
            return Err(invalid(index, step, "parallel branch id is required"));
          }
          validate_steps(&branch.steps)?;
        }
      }
      StepType::Subflow => {
        let sub = step
          .sub_workflow
          .as_ref()
          .ok_or_else(|| invalid(index, step, "sub_workflow configuration is required"))?;
        if sub.workflow.is_empty() {
          return Err(invalid(index, step, "sub_workflow.workflow is required"));
        }
      }
      StepType::Loop => {
        let looped = step
          .r#loop
          .as_ref()
          .ok_or_else(|| invalid(index, step, "loop configuration is required"))?;
        if looped.condition.is_empty() {
          return Err(invalid(index, step, "loop.condition is required"));
        }
        if looped.max_iterations < 1 {
          return Err(invalid(index, step, "loop.max_iterations must be >= 1"));
        }
        validate_steps(&looped.steps)?;
      }
    }
  }

  Ok(())
}

fn invalid(index: usize, step: &StepDef, message: &str) -> ValidationError {
  ValidationError::InvalidStep {
    index,
    name: step.name.clone(),
    message: message.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::load_from_str;

  fn minimal(yaml: &str) -> Result<WorkflowDef, ValidationError> {
    load_from_str(yaml)
  }

  #[test]
  fn test_valid_workflow() {
    let def = minimal(
      r#"
name: user-registration
on:
  event: user.created
workflow:
  - name: send_welcome
    action: log.info
    message: "Welcome!"
"#,
    )
    .unwrap();

    assert_eq!(def.name, "user-registration");
    assert_eq!(def.on.event, "user.created");
    assert_eq!(def.workflow.len(), 1);
    assert_eq!(
      def.workflow[0].config.get("message").and_then(|v| v.as_str()),
      Some("Welcome!")
    );
  }

  #[test]
  fn test_missing_name() {
    let err = minimal(
      r#"
name: ""
on:
  event: user.created
workflow:
  - name: step
    action: log.info
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::MissingName));
  }

  #[test]
  fn test_missing_event() {
    let err = minimal(
      r#"
name: wf
on:
  event: ""
workflow:
  - name: step
    action: log.info
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::MissingEvent));
  }

  #[test]
  fn test_no_steps() {
    let err = minimal(
      r#"
name: wf
on:
  event: user.created
workflow: []
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::NoSteps));
  }

  #[test]
  fn test_missing_step_action() {
    let err = minimal(
      r#"
name: wf
on:
  event: user.created
workflow:
  - name: step
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::MissingAction { index: 0, .. }));
  }

  #[test]
  fn test_retry_max_below_one() {
    let err = minimal(
      r#"
name: wf
on:
  event: user.created
workflow:
  - name: step
    action: log.info
    retry:
      max: 0
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::RetryMax { .. }));
  }

  #[test]
  fn test_unrecognized_backoff_rejected() {
    let err = minimal(
      r#"
name: wf
on:
  event: user.created
workflow:
  - name: step
    action: log.info
    retry:
      max: 2
      backoff: quadratic
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::Parse(_)));
  }

  #[test]
  fn test_parallel_requires_branches() {
    let err = minimal(
      r#"
name: wf
on:
  event: user.created
workflow:
  - name: fanout
    type: parallel
    parallel:
      branches: []
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidStep { .. }));
  }

  #[test]
  fn test_parallel_step_parses() {
    let def = minimal(
      r#"
name: wf
on:
  event: user.created
workflow:
  - name: fanout
    type: parallel
    parallel:
      join: any
      fail_fast: true
      max_parallel: 2
      branches:
        - id: a
          steps:
            - name: log_a
              action: log.info
              message: "a"
        - id: b
          steps:
            - name: log_b
              action: log.info
              message: "b"
"#,
    )
    .unwrap();

    let parallel = def.workflow[0].parallel.as_ref().unwrap();
    assert_eq!(parallel.branches.len(), 2);
    assert_eq!(parallel.join, crate::JoinModeDef::Any);
    assert!(parallel.fail_fast);
  }

  #[test]
  fn test_loop_requires_positive_iterations() {
    let err = minimal(
      r#"
name: wf
on:
  event: tick
workflow:
  - name: poll
    type: loop
    loop:
      condition: "true"
      max_iterations: 0
      steps:
        - name: body
          action: log.info
          message: "hi"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidStep { .. }));
  }
}
