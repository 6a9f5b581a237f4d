use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incoming event that triggers a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  #[serde(rename = "type")]
  pub event_type: String,
  #[serde(default)]
  pub payload: serde_json::Map<String, serde_json::Value>,
  #[serde(default)]
  pub metadata: serde_json::Map<String, serde_json::Value>,
  /// Unix seconds.
  pub timestamp: i64,
}

impl Event {
  pub fn new(event_type: impl Into<String>) -> Self {
    Self {
      event_type: event_type.into(),
      payload: serde_json::Map::new(),
      metadata: serde_json::Map::new(),
      timestamp: Utc::now().timestamp(),
    }
  }

  pub fn with_payload(mut self, payload: serde_json::Map<String, serde_json::Value>) -> Self {
    self.payload = payload;
    self
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.metadata.insert(key.into(), value);
    self
  }
}

/// Shared context for one workflow execution: the immutable event plus the
/// variables mapping that accumulates step outputs under each step's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
  pub event: Event,
  #[serde(default)]
  pub variables: serde_json::Map<String, serde_json::Value>,
}

impl EventContext {
  pub fn new(event: Event) -> Self {
    Self {
      event,
      variables: serde_json::Map::new(),
    }
  }

  /// Context seeded with the event payload as initial variables, so
  /// conditions and mappings can address event data directly.
  pub fn seeded(event: Event) -> Self {
    let variables = event.payload.clone();
    Self { event, variables }
  }

  /// The data tree templates resolve against.
  pub fn template_data(&self) -> serde_json::Value {
    serde_json::json!({
      "event": {
        "type": self.event.event_type,
        "payload": self.event.payload,
        "metadata": self.event.metadata,
        "timestamp": self.event.timestamp,
      },
      "variables": self.variables,
    })
  }
}

/// Status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
  Pending,
  Running,
  Completed,
  Failed,
  Cancelled,
  Paused,
}

impl InstanceStatus {
  /// Terminal statuses set `end_time` exactly once.
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      InstanceStatus::Completed | InstanceStatus::Failed | InstanceStatus::Cancelled
    )
  }
}

/// Status of a single step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Running,
  Completed,
  Skipped,
  Failed,
  Cancelled,
}

/// The durable record of one workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
  pub id: String,
  pub workflow_name: String,
  pub status: InstanceStatus,
  pub start_time: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_time: Option<DateTime<Utc>>,
  pub context: EventContext,
  pub steps: Vec<StepExecution>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Id of the parent execution for sub-workflow instances.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<String>,
  /// Ids of sub-workflow instances spawned by this execution.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub sub_instances: Vec<String>,
}

/// One row in an instance's step history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
  pub name: String,
  pub status: StepStatus,
  pub start_time: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_time: Option<DateTime<Utc>>,
  /// Materialized input after template resolution.
  #[serde(default)]
  pub input: serde_json::Map<String, serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Map<String, serde_json::Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Retries that ultimately ran; 0 for a first-attempt success.
  #[serde(default)]
  pub retries: u32,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_template_data_shape() {
    let event = Event::new("user.created")
      .with_payload(
        json!({ "name": "Ada" })
          .as_object()
          .cloned()
          .unwrap_or_default(),
      )
      .with_metadata("remote_addr", json!("127.0.0.1"));

    let mut ctx = EventContext::new(event);
    ctx
      .variables
      .insert("step1".to_string(), json!({ "field": "X" }));

    let data = ctx.template_data();
    assert_eq!(data["event"]["type"], "user.created");
    assert_eq!(data["event"]["payload"]["name"], "Ada");
    assert_eq!(data["event"]["metadata"]["remote_addr"], "127.0.0.1");
    assert_eq!(data["variables"]["step1"]["field"], "X");
  }

  #[test]
  fn test_seeded_context_exposes_payload_as_variables() {
    let event = Event::new("user.created").with_payload(
      json!({ "name": "Ada" })
        .as_object()
        .cloned()
        .unwrap_or_default(),
    );
    let ctx = EventContext::seeded(event);
    assert_eq!(ctx.variables.get("name"), Some(&json!("Ada")));
  }

  #[test]
  fn test_status_serialization() {
    assert_eq!(
      serde_json::to_string(&InstanceStatus::Running).unwrap(),
      "\"running\""
    );
    assert_eq!(
      serde_json::to_string(&StepStatus::Skipped).unwrap(),
      "\"skipped\""
    );
  }

  #[test]
  fn test_terminal_statuses() {
    assert!(InstanceStatus::Completed.is_terminal());
    assert!(InstanceStatus::Failed.is_terminal());
    assert!(InstanceStatus::Cancelled.is_terminal());
    assert!(!InstanceStatus::Running.is_terminal());
    assert!(!InstanceStatus::Paused.is_terminal());
  }
}
