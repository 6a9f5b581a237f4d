use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use weft_actions::ActionRegistry;
use weft_store::{EventContext, InstanceStore, StoreError, WorkflowInstance};
use weft_template::TemplateResolver;
use weft_workflow::Workflow;

use crate::error::EngineError;
use crate::orchestrator::Orchestrator;

/// The engine facade.
///
/// Self-contained: all collaborators are passed in at construction, so
/// multiple engines can coexist in one process. Cloning is cheap and all
/// clones share the same workflow table, registry, and store.
#[derive(Clone)]
pub struct Engine {
  pub(crate) inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
  pub(crate) registry: Arc<ActionRegistry>,
  pub(crate) store: Arc<dyn InstanceStore>,
  pub(crate) templates: TemplateResolver,
  pub(crate) workflows: RwLock<WorkflowTable>,
  pub(crate) control: Mutex<HashMap<String, InstanceControl>>,
}

#[derive(Default)]
pub(crate) struct WorkflowTable {
  pub(crate) by_event: HashMap<String, Arc<Workflow>>,
  pub(crate) by_name: HashMap<String, Arc<Workflow>>,
}

/// Live handle for a running instance.
pub(crate) struct InstanceControl {
  pub(crate) cancel: CancellationToken,
  pub(crate) pause: watch::Sender<bool>,
}

impl Engine {
  pub fn new(registry: Arc<ActionRegistry>, store: Arc<dyn InstanceStore>) -> Self {
    Self {
      inner: Arc::new(EngineInner {
        registry,
        store,
        templates: TemplateResolver::new(),
        workflows: RwLock::new(WorkflowTable::default()),
        control: Mutex::new(HashMap::new()),
      }),
    }
  }

  /// Register a workflow. Last writer wins per event type and per name.
  pub fn register_workflow(&self, workflow: Workflow) {
    info!(name = %workflow.name, event = %workflow.event, "workflow registered");
    let workflow = Arc::new(workflow);
    let mut table = self
      .inner
      .workflows
      .write()
      .unwrap_or_else(|e| e.into_inner());
    table
      .by_event
      .insert(workflow.event.clone(), workflow.clone());
    table.by_name.insert(workflow.name.clone(), workflow);
  }

  /// The workflow registered for an event type, if any.
  pub fn workflow_for_event(&self, event_type: &str) -> Option<Arc<Workflow>> {
    let table = self.inner.workflows.read().unwrap_or_else(|e| e.into_inner());
    table.by_event.get(event_type).cloned()
  }

  /// Look up a workflow by name (sub-workflow targets resolve here).
  pub fn workflow_by_name(&self, name: &str) -> Option<Arc<Workflow>> {
    self.inner.workflow_by_name(name)
  }

  /// Execute a workflow instance to a terminal status.
  ///
  /// Returns the instance id on completion. Failure errors carry the
  /// instance id so the persisted record can still be inspected.
  pub async fn execute(
    &self,
    workflow: Arc<Workflow>,
    event_ctx: EventContext,
  ) -> Result<String, EngineError> {
    let orchestrator = Orchestrator::new(self.inner.clone());
    let finished = orchestrator
      .run(workflow, event_ctx, None, CancellationToken::new())
      .await?;
    Ok(finished.instance_id)
  }

  /// Fetch an instance record from the store.
  pub async fn instance(&self, id: &str) -> Result<WorkflowInstance, EngineError> {
    self.inner.store.get(id).await.map_err(|e| match e {
      StoreError::NotFound(id) => EngineError::InstanceNotFound(id),
      other => EngineError::Store(other),
    })
  }

  /// List all known instances.
  pub async fn instances(&self) -> Result<Vec<WorkflowInstance>, EngineError> {
    Ok(self.inner.store.list().await?)
  }

  /// Cancel a running instance. The cancellation propagates to all branches
  /// and sub-workflows; the instance transitions to `cancelled`.
  pub fn cancel(&self, id: &str) -> Result<(), EngineError> {
    let control = self.inner.control.lock().unwrap_or_else(|e| e.into_inner());
    let handle = control
      .get(id)
      .ok_or_else(|| EngineError::InstanceNotFound(id.to_string()))?;
    handle.cancel.cancel();
    Ok(())
  }

  /// Pause a running instance; checked before each step dispatch.
  pub fn pause(&self, id: &str) -> Result<(), EngineError> {
    self.set_paused(id, true)
  }

  /// Resume a paused instance.
  pub fn resume(&self, id: &str) -> Result<(), EngineError> {
    self.set_paused(id, false)
  }

  fn set_paused(&self, id: &str, paused: bool) -> Result<(), EngineError> {
    let control = self.inner.control.lock().unwrap_or_else(|e| e.into_inner());
    let handle = control
      .get(id)
      .ok_or_else(|| EngineError::InstanceNotFound(id.to_string()))?;
    handle.pause.send_replace(paused);
    Ok(())
  }
}

impl EngineInner {
  pub(crate) fn workflow_by_name(&self, name: &str) -> Option<Arc<Workflow>> {
    let table = self.workflows.read().unwrap_or_else(|e| e.into_inner());
    table.by_name.get(name).cloned()
  }
}
