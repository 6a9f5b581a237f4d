//! Durable per-instance execution state.
//!
//! The store is interface-driven: the engine talks to `InstanceStore` and the
//! reference implementation keeps one JSON document per instance in a
//! directory. `MemoryStore` backs tests and embedded use.

mod error;
mod json;
mod memory;
mod types;

use async_trait::async_trait;

pub use error::StoreError;
pub use json::JsonDirStore;
pub use memory::MemoryStore;
pub use types::{
  Event, EventContext, InstanceStatus, StepExecution, StepStatus, WorkflowInstance,
};

/// Persistence interface for workflow instances.
#[async_trait]
pub trait InstanceStore: Send + Sync {
  /// Upsert an instance by id. Safe to call repeatedly.
  async fn save(&self, instance: &WorkflowInstance) -> Result<(), StoreError>;

  /// Fetch an instance by id.
  async fn get(&self, id: &str) -> Result<WorkflowInstance, StoreError>;

  /// List all instances, best-effort: documents that fail to parse are
  /// silently skipped.
  async fn list(&self) -> Result<Vec<WorkflowInstance>, StoreError>;
}
