use tracing::{error, info, warn};

use weft_engine::Engine;
use weft_store::{Event, EventContext};

/// The shared dispatch routine every trigger uses.
#[derive(Clone)]
pub struct EventDispatcher {
  engine: Engine,
}

impl EventDispatcher {
  pub fn new(engine: Engine) -> Self {
    Self { engine }
  }

  pub fn engine(&self) -> &Engine {
    &self.engine
  }

  /// Dispatch an event: look up the workflow for its type and execute it on
  /// a fresh task. An unknown event type is a warning, not an error — the
  /// event is dropped. Execution failures are logged through the engine's
  /// tracing output and never surfaced to the trigger's source.
  ///
  /// Returns the spawned task handle when a workflow matched.
  pub fn dispatch(&self, event: Event) -> Option<tokio::task::JoinHandle<()>> {
    let Some(workflow) = self.engine.workflow_for_event(&event.event_type) else {
      warn!(event = %event.event_type, "no workflow found for event");
      return None;
    };

    let engine = self.engine.clone();
    let event_type = event.event_type.clone();
    let event_ctx = EventContext::seeded(event);

    Some(tokio::spawn(async move {
      match engine.execute(workflow, event_ctx).await {
        Ok(instance_id) => {
          info!(event = %event_type, instance_id = %instance_id, "workflow execution completed");
        }
        Err(e) => {
          error!(event = %event_type, error = %e, "workflow execution failed");
        }
      }
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use serde_json::json;
  use weft_actions::ActionRegistry;
  use weft_store::{InstanceStore, MemoryStore};

  fn dispatcher_with(yaml: &str) -> (EventDispatcher, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(
      Arc::new(ActionRegistry::with_builtins()),
      store.clone() as Arc<dyn InstanceStore>,
    );
    let def = weft_config::load_from_str(yaml).expect("valid definition");
    engine.register_workflow(weft_workflow::compile(&def).expect("compiles"));
    (EventDispatcher::new(engine), store)
  }

  #[tokio::test]
  async fn test_dispatch_executes_matching_workflow() {
    let (dispatcher, store) = dispatcher_with(
      r#"
name: greeter
on:
  event: user.created
workflow:
  - name: greet
    action: log.info
    message: "Hello {{ event.payload.name }}"
"#,
    );

    let event = Event::new("user.created").with_payload(
      json!({ "name": "Ada" }).as_object().cloned().unwrap(),
    );

    let handle = dispatcher.dispatch(event).expect("workflow matched");
    handle.await.unwrap();

    let instances = store.list().await.unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].workflow_name, "greeter");
  }

  #[tokio::test]
  async fn test_unknown_event_type_is_dropped() {
    let (dispatcher, store) = dispatcher_with(
      r#"
name: greeter
on:
  event: user.created
workflow:
  - name: greet
    action: log.info
    message: "Hello"
"#,
    );

    assert!(dispatcher.dispatch(Event::new("order.created")).is_none());
    assert!(store.list().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_metadata_rides_along() {
    let (dispatcher, store) = dispatcher_with(
      r#"
name: auditor
on:
  event: file.created
workflow:
  - name: audit
    action: log.info
    message: "saw {{ event.metadata.path }}"
"#,
    );

    let event = Event::new("file.created").with_metadata("path", json!("/tmp/report.csv"));
    let handle = dispatcher.dispatch(event).expect("workflow matched");
    handle.await.unwrap();

    let instances = store.list().await.unwrap();
    let input = &instances[0].steps[0].input;
    assert_eq!(input["message"], "saw /tmp/report.csv");
  }
}
