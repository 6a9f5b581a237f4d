use std::sync::Arc;

use serde_json::json;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use weft_actions::ActionOutput;
use weft_store::EventContext;
use weft_template::is_truthy;
use weft_workflow::{Branch, JoinMode, ParallelSpec, Step};

use crate::error::EngineError;
use crate::orchestrator::{Orchestrator, RunState};

impl Orchestrator {
  /// Execute a parallel step: qualifying branches run concurrently under a
  /// semaphore cap, results are joined over a completion channel.
  pub(crate) async fn execute_parallel(
    &self,
    step: &Step,
    spec: &ParallelSpec,
    state: &RunState,
    cancel: &CancellationToken,
  ) -> Result<ActionOutput, EngineError> {
    let region = cancel.child_token();
    let mut results = serde_json::Map::new();
    let mut errors = serde_json::Map::new();

    let permits = if spec.max_parallel == 0 {
      spec.branches.len().max(1)
    } else {
      spec.max_parallel
    };
    let semaphore = Arc::new(Semaphore::new(permits));
    let (tx, mut rx) = mpsc::unbounded_channel::<(String, Result<ActionOutput, EngineError>)>();

    // Branch conditions are evaluated against the parent context.
    let data = state.ctx.template_data();
    let mut in_flight = 0usize;

    for branch in &spec.branches {
      if let Some(condition) = &branch.condition {
        let resolved = self.inner.templates.render(condition, &data)?;
        if !is_truthy(&resolved) {
          info!(branch = %branch.id, "branch skipped");
          results.insert(branch.id.clone(), json!("skipped"));
          continue;
        }
      }

      in_flight += 1;

      let mut branch_ctx = state.ctx.clone();
      for (key, value) in &branch.variables {
        branch_ctx.variables.insert(key.clone(), value.clone());
      }

      let orchestrator = self.clone();
      let branch = branch.clone();
      let branch_cancel = region.child_token();
      let semaphore = semaphore.clone();
      let tx = tx.clone();
      let instance_id = state.instance_id.clone();

      tokio::spawn(async move {
        let _permit = match semaphore.acquire_owned().await {
          Ok(permit) => permit,
          Err(_) => return,
        };
        if branch_cancel.is_cancelled() {
          let _ = tx.send((branch.id.clone(), Err(EngineError::Cancelled)));
          return;
        }
        let result = orchestrator
          .run_branch(&branch, branch_ctx, instance_id, &branch_cancel)
          .await;
        let _ = tx.send((branch.id.clone(), result));
      });
    }
    drop(tx);

    let join = async {
      let mut completed = 0usize;
      while completed < in_flight {
        let Some((branch_id, result)) = rx.recv().await else {
          break;
        };
        completed += 1;
        match result {
          Ok(output) => {
            results.insert(branch_id, serde_json::Value::Object(output));
            if matches!(spec.join, JoinMode::Any | JoinMode::First) {
              break;
            }
          }
          Err(e) => {
            if spec.fail_fast {
              return Err(EngineError::BranchFailed {
                branch: branch_id,
                message: e.to_string(),
              });
            }
            warn!(branch = %branch_id, error = %e, "branch failed");
            errors.insert(branch_id, json!(e.to_string()));
            if matches!(spec.join, JoinMode::First) {
              break;
            }
          }
        }
      }
      Ok(())
    };

    let joined = match spec.timeout {
      Some(bound) => match tokio::time::timeout(bound, join).await {
        Ok(joined) => joined,
        Err(_) => {
          region.cancel();
          return Err(EngineError::Timeout {
            step: step.name.clone(),
          });
        }
      },
      None => join.await,
    };

    // Cancel stragglers; a no-op when every branch already finished.
    region.cancel();
    joined?;

    if cancel.is_cancelled() {
      return Err(EngineError::Cancelled);
    }

    let mut output = ActionOutput::new();
    output.insert("results".to_string(), serde_json::Value::Object(results));
    output.insert("errors".to_string(), serde_json::Value::Object(errors));
    output.insert("status".to_string(), json!("completed"));
    Ok(output)
  }

  /// Run one branch's steps sequentially in its own context. The branch
  /// stops at its first failing step; outputs accumulate under step names
  /// and never touch the parent's variables.
  async fn run_branch(
    &self,
    branch: &Branch,
    ctx: EventContext,
    instance_id: String,
    cancel: &CancellationToken,
  ) -> Result<ActionOutput, EngineError> {
    let mut state = RunState {
      instance_id,
      ctx,
      spawned_subs: Vec::new(),
    };
    let mut outputs = ActionOutput::new();

    for step in &branch.steps {
      if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
      }

      if let Some(condition) = &step.condition {
        let resolved = self
          .inner
          .templates
          .render(condition, &state.ctx.template_data())?;
        if !is_truthy(&resolved) {
          continue;
        }
      }

      let report = self.run_step(step, &mut state, cancel).await;
      let output = report.result?;
      state.ctx.variables.insert(
        step.name.clone(),
        serde_json::Value::Object(output.clone()),
      );
      outputs.insert(step.name.clone(), serde_json::Value::Object(output));
    }

    Ok(outputs)
  }
}
