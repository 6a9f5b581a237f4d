use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::json;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use weft_actions::{ActionInput, ActionOutput};
use weft_store::{
  EventContext, InstanceStatus, StepExecution, StepStatus, WorkflowInstance,
};
use weft_template::is_truthy;
use weft_workflow::{LoopSpec, Step, StepKind, SubFlowSpec, Workflow};

use crate::engine::{EngineInner, InstanceControl};
use crate::error::EngineError;

/// Drives a single workflow instance to a terminal status.
#[derive(Clone)]
pub(crate) struct Orchestrator {
  pub(crate) inner: Arc<EngineInner>,
}

/// What a finished run hands back to its caller: the instance id and the
/// final variables, which sub-workflow output mappings project from.
pub(crate) struct FinishedRun {
  pub(crate) instance_id: String,
  pub(crate) variables: serde_json::Map<String, serde_json::Value>,
}

/// Mutable execution state threaded through step dispatch.
pub(crate) struct RunState {
  pub(crate) instance_id: String,
  pub(crate) ctx: EventContext,
  /// Sub-instance ids spawned by steps, drained into the instance record.
  pub(crate) spawned_subs: Vec<String>,
}

/// Attempt bookkeeping that survives a step timeout.
#[derive(Default)]
struct StepProgress {
  input: Mutex<ActionInput>,
  retries: AtomicU32,
}

/// Result of one step, with the bookkeeping the history row needs either way.
pub(crate) struct StepReport {
  pub(crate) input: ActionInput,
  pub(crate) retries: u32,
  pub(crate) result: Result<ActionOutput, EngineError>,
}

impl Orchestrator {
  pub(crate) fn new(inner: Arc<EngineInner>) -> Self {
    Self { inner }
  }

  pub(crate) async fn run(
    &self,
    workflow: Arc<Workflow>,
    event_ctx: EventContext,
    parent_id: Option<String>,
    cancel: CancellationToken,
  ) -> Result<FinishedRun, EngineError> {
    let instance_id = Uuid::new_v4().to_string();
    self
      .run_with_id(instance_id, workflow, event_ctx, parent_id, cancel)
      .await
  }

  #[instrument(
    name = "workflow_execute",
    skip(self, workflow, event_ctx, cancel),
    fields(workflow = %workflow.name, instance_id = %instance_id)
  )]
  pub(crate) async fn run_with_id(
    &self,
    instance_id: String,
    workflow: Arc<Workflow>,
    event_ctx: EventContext,
    parent_id: Option<String>,
    cancel: CancellationToken,
  ) -> Result<FinishedRun, EngineError> {
    let (pause_tx, pause_rx) = watch::channel(false);
    {
      let mut control = self.inner.control.lock().unwrap_or_else(|e| e.into_inner());
      control.insert(
        instance_id.clone(),
        InstanceControl {
          cancel: cancel.clone(),
          pause: pause_tx,
        },
      );
    }

    let result = self
      .run_inner(&instance_id, &workflow, event_ctx, parent_id, &cancel, pause_rx)
      .await;

    {
      let mut control = self.inner.control.lock().unwrap_or_else(|e| e.into_inner());
      control.remove(&instance_id);
    }

    result
  }

  async fn run_inner(
    &self,
    instance_id: &str,
    workflow: &Workflow,
    event_ctx: EventContext,
    parent_id: Option<String>,
    cancel: &CancellationToken,
    mut pause_rx: watch::Receiver<bool>,
  ) -> Result<FinishedRun, EngineError> {
    let mut instance = WorkflowInstance {
      id: instance_id.to_string(),
      workflow_name: workflow.name.clone(),
      status: InstanceStatus::Running,
      start_time: Utc::now(),
      end_time: None,
      context: event_ctx.clone(),
      steps: Vec::new(),
      error: None,
      parent_id,
      sub_instances: Vec::new(),
    };

    let mut state = RunState {
      instance_id: instance_id.to_string(),
      ctx: event_ctx,
      spawned_subs: Vec::new(),
    };

    info!("workflow started");
    self.sync_and_save(&mut instance, &state).await;

    for step in &workflow.steps {
      if cancel.is_cancelled() {
        return self.finish_cancelled(&mut instance, &state).await;
      }

      if *pause_rx.borrow() {
        self.wait_resumed(&mut instance, &state, cancel, &mut pause_rx).await?;
        if cancel.is_cancelled() {
          return self.finish_cancelled(&mut instance, &state).await;
        }
      }

      // Condition gating.
      if let Some(condition) = &step.condition {
        let resolved = match self
          .inner
          .templates
          .render(condition, &state.ctx.template_data())
        {
          Ok(resolved) => resolved,
          Err(e) => {
            let now = Utc::now();
            instance.steps.push(StepExecution {
              name: step.name.clone(),
              status: StepStatus::Failed,
              start_time: now,
              end_time: Some(now),
              input: ActionInput::new(),
              output: None,
              error: Some(e.to_string()),
              retries: 0,
            });
            return self
              .finish_failed(&mut instance, &state, &step.name, &e.into())
              .await;
          }
        };
        if !is_truthy(&resolved) {
          let now = Utc::now();
          info!(step = %step.name, "step skipped");
          instance.steps.push(StepExecution {
            name: step.name.clone(),
            status: StepStatus::Skipped,
            start_time: now,
            end_time: Some(now),
            input: ActionInput::new(),
            output: None,
            error: None,
            retries: 0,
          });
          self.sync_and_save(&mut instance, &state).await;
          continue;
        }
      }

      info!(step = %step.name, "step started");
      instance.steps.push(StepExecution {
        name: step.name.clone(),
        status: StepStatus::Running,
        start_time: Utc::now(),
        end_time: None,
        input: ActionInput::new(),
        output: None,
        error: None,
        retries: 0,
      });
      self.sync_and_save(&mut instance, &state).await;

      let report = self.run_step(step, &mut state, cancel).await;
      instance.sub_instances.append(&mut state.spawned_subs);

      let Some(row) = instance.steps.last_mut() else {
        continue;
      };
      row.input = report.input;
      row.retries = report.retries;

      match report.result {
        Ok(output) => {
          row.status = StepStatus::Completed;
          row.end_time = Some(Utc::now());
          row.output = Some(output.clone());
          state
            .ctx
            .variables
            .insert(step.name.clone(), serde_json::Value::Object(output));
          info!(step = %step.name, "step completed");
          self.sync_and_save(&mut instance, &state).await;
        }
        Err(EngineError::Cancelled) => {
          row.status = StepStatus::Cancelled;
          return self.finish_cancelled(&mut instance, &state).await;
        }
        Err(e) => {
          row.status = StepStatus::Failed;
          row.end_time = Some(Utc::now());
          row.error = Some(e.to_string());
          return self.finish_failed(&mut instance, &state, &step.name, &e).await;
        }
      }
    }

    instance.status = InstanceStatus::Completed;
    instance.end_time = Some(Utc::now());
    self.sync_and_save(&mut instance, &state).await;
    info!("workflow completed");

    Ok(FinishedRun {
      instance_id: instance.id,
      variables: state.ctx.variables,
    })
  }

  /// Block until the instance is resumed, persisting the paused transition.
  async fn wait_resumed(
    &self,
    instance: &mut WorkflowInstance,
    state: &RunState,
    cancel: &CancellationToken,
    pause_rx: &mut watch::Receiver<bool>,
  ) -> Result<(), EngineError> {
    info!("workflow paused");
    instance.status = InstanceStatus::Paused;
    self.sync_and_save(instance, state).await;

    while *pause_rx.borrow() {
      tokio::select! {
        changed = pause_rx.changed() => {
          if changed.is_err() {
            break;
          }
        }
        _ = cancel.cancelled() => return Ok(()),
      }
    }

    info!("workflow resumed");
    instance.status = InstanceStatus::Running;
    self.sync_and_save(instance, state).await;
    Ok(())
  }

  /// Run one step: dispatch by kind with retry, bounded by the step timeout.
  ///
  /// Boxed explicitly (rather than `async fn`) to break the recursive opaque
  /// future cycle through `dispatch` -> `execute_subflow` -> `run_with_id` ->
  /// `run_inner` -> `run_step`, which rustc cannot otherwise resolve.
  pub(crate) fn run_step<'a>(
    &'a self,
    step: &'a Step,
    state: &'a mut RunState,
    cancel: &'a CancellationToken,
  ) -> std::pin::Pin<Box<dyn std::future::Future<Output = StepReport> + Send + 'a>> {
    Box::pin(async move {
      let progress = StepProgress::default();

      let attempts = self.run_attempts(step, state, cancel, &progress);
      let result = match step.timeout {
        Some(bound) => tokio::time::timeout(bound, attempts)
          .await
          .unwrap_or_else(|_| {
            Err(EngineError::Timeout {
              step: step.name.clone(),
            })
          }),
        None => attempts.await,
      };

      let input = progress
        .input
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
      StepReport {
        input,
        retries: progress.retries.load(Ordering::Relaxed),
        result,
      }
    })
  }

  async fn run_attempts(
    &self,
    step: &Step,
    state: &mut RunState,
    cancel: &CancellationToken,
    progress: &StepProgress,
  ) -> Result<ActionOutput, EngineError> {
    let policy = step.retry.clone().unwrap_or_default();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
      progress.retries.store(attempt, Ordering::Relaxed);

      match self.dispatch(step, state, cancel, progress).await {
        Ok(output) => return Ok(output),
        Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
        Err(e) => {
          if attempt + 1 >= max_attempts {
            return Err(e);
          }
          warn!(
            step = %step.name,
            attempt = attempt + 1,
            max_attempts,
            error = %e,
            "step attempt failed"
          );
        }
      }

      attempt += 1;
      let delay = policy.delay_for_attempt(attempt);
      info!(
        step = %step.name,
        attempt = attempt + 1,
        delay = %humantime::format_duration(delay),
        "retrying step after backoff"
      );
      tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = cancel.cancelled() => return Err(EngineError::Cancelled),
      }
    }
  }

  async fn dispatch(
    &self,
    step: &Step,
    state: &mut RunState,
    cancel: &CancellationToken,
    progress: &StepProgress,
  ) -> Result<ActionOutput, EngineError> {
    if cancel.is_cancelled() {
      return Err(EngineError::Cancelled);
    }

    match &step.kind {
      StepKind::Action { action, config } => {
        self
          .execute_action(step, action, config, state, cancel, progress)
          .await
      }
      StepKind::Condition { condition } => self.execute_condition(step, condition, state),
      StepKind::Delay { duration } => self.execute_delay(*duration, cancel).await,
      StepKind::Parallel(spec) => self.execute_parallel(step, spec, state, cancel).await,
      StepKind::SubFlow(spec) => self.execute_subflow(step, spec, state, cancel).await,
      StepKind::Loop(spec) => self.execute_loop(spec, state, cancel).await,
    }
  }

  async fn execute_action(
    &self,
    step: &Step,
    action: &str,
    config: &serde_json::Map<String, serde_json::Value>,
    state: &RunState,
    cancel: &CancellationToken,
    progress: &StepProgress,
  ) -> Result<ActionOutput, EngineError> {
    let capability = self
      .inner
      .registry
      .get(action)
      .ok_or_else(|| EngineError::UnknownAction {
        step: step.name.clone(),
        action: action.to_string(),
      })?;

    let input = self
      .inner
      .templates
      .render_map(config, &state.ctx.template_data())?;
    {
      let mut slot = progress.input.lock().unwrap_or_else(|e| e.into_inner());
      *slot = input.clone();
    }

    Ok(capability.execute(cancel, &input).await?)
  }

  fn execute_condition(
    &self,
    step: &Step,
    condition: &str,
    state: &RunState,
  ) -> Result<ActionOutput, EngineError> {
    let resolved = self
      .inner
      .templates
      .render(condition, &state.ctx.template_data())?;
    let result = is_truthy(&resolved);
    let next_steps = if result {
      &step.on_success
    } else {
      &step.on_failure
    };

    let mut output = ActionOutput::new();
    output.insert("condition".to_string(), json!(condition));
    output.insert("result".to_string(), json!(result));
    output.insert("next_steps".to_string(), json!(next_steps));
    Ok(output)
  }

  async fn execute_delay(
    &self,
    duration: std::time::Duration,
    cancel: &CancellationToken,
  ) -> Result<ActionOutput, EngineError> {
    tokio::select! {
      _ = tokio::time::sleep(duration) => {
        let mut output = ActionOutput::new();
        output.insert(
          "delayed".to_string(),
          json!(humantime::format_duration(duration).to_string()),
        );
        output.insert("status".to_string(), json!("completed"));
        Ok(output)
      }
      _ = cancel.cancelled() => Err(EngineError::Cancelled),
    }
  }

  async fn execute_loop(
    &self,
    spec: &LoopSpec,
    state: &mut RunState,
    cancel: &CancellationToken,
  ) -> Result<ActionOutput, EngineError> {
    let mut results = Vec::new();
    let mut iterations = 0u32;

    while iterations < spec.max_iterations {
      if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
      }

      let resolved = self
        .inner
        .templates
        .render(&spec.condition, &state.ctx.template_data())?;
      if !is_truthy(&resolved) {
        break;
      }

      let mut iteration_result = serde_json::Map::new();
      for body_step in &spec.steps {
        if let Some(condition) = &body_step.condition {
          let resolved = self
            .inner
            .templates
            .render(condition, &state.ctx.template_data())?;
          if !is_truthy(&resolved) {
            continue;
          }
        }
        let report = self.run_step(body_step, state, cancel).await;
        let output = report.result?;
        state.ctx.variables.insert(
          body_step.name.clone(),
          serde_json::Value::Object(output.clone()),
        );
        iteration_result.insert(body_step.name.clone(), serde_json::Value::Object(output));
      }

      results.push(serde_json::Value::Object(iteration_result));
      iterations += 1;
    }

    let mut output = ActionOutput::new();
    output.insert("iterations".to_string(), json!(iterations));
    output.insert("results".to_string(), serde_json::Value::Array(results));
    output.insert("status".to_string(), json!("completed"));
    Ok(output)
  }

  async fn execute_subflow(
    &self,
    step: &Step,
    spec: &SubFlowSpec,
    state: &mut RunState,
    cancel: &CancellationToken,
  ) -> Result<ActionOutput, EngineError> {
    let workflow = self
      .inner
      .workflow_by_name(&spec.workflow)
      .ok_or_else(|| EngineError::WorkflowNotFound(spec.workflow.clone()))?;

    // Project parent variables through the input mapping, then layer the
    // step's static variables.
    let data = state.ctx.template_data();
    let mut sub_vars = serde_json::Map::new();
    for (sub_var, parent_ref) in &spec.input {
      if let Some(value) = lookup_reference(&state.ctx, &data, parent_ref) {
        sub_vars.insert(sub_var.clone(), value);
      }
    }
    for (key, value) in &spec.variables {
      sub_vars.insert(key.clone(), value.clone());
    }

    let sub_ctx = EventContext {
      event: state.ctx.event.clone(),
      variables: sub_vars,
    };
    let sub_cancel = cancel.child_token();

    if spec.run_async {
      let sub_id = Uuid::new_v4().to_string();
      state.spawned_subs.push(sub_id.clone());

      let orchestrator = self.clone();
      let parent = state.instance_id.clone();
      let spawned_id = sub_id.clone();
      info!(sub_workflow = %spec.workflow, sub_id = %sub_id, "sub-workflow started");
      tokio::spawn(async move {
        if let Err(e) = orchestrator
          .run_with_id(spawned_id, workflow, sub_ctx, Some(parent), sub_cancel)
          .await
        {
          error!(error = %e, "async sub-workflow failed");
        }
      });

      let mut output = ActionOutput::new();
      output.insert("status".to_string(), json!("started"));
      output.insert("executionId".to_string(), json!(sub_id));
      Ok(output)
    } else {
      let orchestrator = self.clone();
      let parent = state.instance_id.clone();
      let handle_cancel = sub_cancel.clone();
      let mut handle = tokio::spawn(async move {
        orchestrator
          .run(workflow, sub_ctx, Some(parent), handle_cancel)
          .await
      });

      let joined = match spec.timeout {
        Some(bound) => match tokio::time::timeout(bound, &mut handle).await {
          Ok(joined) => joined,
          Err(_) => {
            sub_cancel.cancel();
            return Err(EngineError::Timeout {
              step: step.name.clone(),
            });
          }
        },
        None => handle.await,
      };

      let finished = joined.map_err(|e| EngineError::Join(e.to_string()))??;
      state.spawned_subs.push(finished.instance_id.clone());

      // Write sub variables back through the output mapping.
      for (parent_var, sub_var) in &spec.output {
        if let Some(value) = lookup_in_variables(&finished.variables, sub_var) {
          state.ctx.variables.insert(parent_var.clone(), value);
        }
      }

      let mut output = ActionOutput::new();
      output.insert("status".to_string(), json!("completed"));
      output.insert("executionId".to_string(), json!(finished.instance_id));
      output.insert(
        "variables".to_string(),
        serde_json::Value::Object(finished.variables),
      );
      Ok(output)
    }
  }

  async fn finish_cancelled(
    &self,
    instance: &mut WorkflowInstance,
    state: &RunState,
  ) -> Result<FinishedRun, EngineError> {
    warn!("workflow cancelled");
    instance.status = InstanceStatus::Cancelled;
    instance.end_time = Some(Utc::now());
    self.sync_and_save(instance, state).await;
    Err(EngineError::Cancelled)
  }

  async fn finish_failed(
    &self,
    instance: &mut WorkflowInstance,
    state: &RunState,
    step_name: &str,
    err: &EngineError,
  ) -> Result<FinishedRun, EngineError> {
    let message = err.to_string();
    error!(step = step_name, error = %message, "workflow failed");
    instance.status = InstanceStatus::Failed;
    instance.error = Some(format!("Step '{}' failed: {}", step_name, message));
    instance.end_time = Some(Utc::now());
    self.sync_and_save(instance, state).await;
    Err(EngineError::StepFailed {
      instance_id: instance.id.clone(),
      step: step_name.to_string(),
      message,
    })
  }

  /// Persist the instance with its context brought up to date. Persistence
  /// failures are logged; the in-memory state stays authoritative.
  async fn sync_and_save(&self, instance: &mut WorkflowInstance, state: &RunState) {
    instance.context = state.ctx.clone();
    if let Err(e) = self.inner.store.save(instance).await {
      error!(error = %e, "failed to persist instance");
    }
  }
}

/// Resolve an input-mapping reference against the parent context: a plain
/// key reads the variables mapping, a dotted path walks the template data
/// root (`event.payload.x`, `variables.step1.field`).
fn lookup_reference(
  ctx: &EventContext,
  data: &serde_json::Value,
  reference: &str,
) -> Option<serde_json::Value> {
  if let Some(value) = ctx.variables.get(reference) {
    return Some(value.clone());
  }

  let mut current = data;
  for part in reference.split('.') {
    current = current.get(part)?;
  }
  Some(current.clone())
}

/// Resolve a reference inside a variables mapping: a plain key first, then a
/// dotted path (`produce.result`).
fn lookup_in_variables(
  variables: &serde_json::Map<String, serde_json::Value>,
  reference: &str,
) -> Option<serde_json::Value> {
  if let Some(value) = variables.get(reference) {
    return Some(value.clone());
  }

  let mut parts = reference.split('.');
  let mut current = variables.get(parts.next()?)?;
  for part in parts {
    current = current.get(part)?;
  }
  Some(current.clone())
}
