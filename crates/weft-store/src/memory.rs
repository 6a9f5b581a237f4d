use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::WorkflowInstance;
use crate::InstanceStore;

/// In-memory store for tests and embedded use.
#[derive(Default)]
pub struct MemoryStore {
  instances: RwLock<HashMap<String, WorkflowInstance>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl InstanceStore for MemoryStore {
  async fn save(&self, instance: &WorkflowInstance) -> Result<(), StoreError> {
    let mut instances = self.instances.write().unwrap_or_else(|e| e.into_inner());
    instances.insert(instance.id.clone(), instance.clone());
    Ok(())
  }

  async fn get(&self, id: &str) -> Result<WorkflowInstance, StoreError> {
    let instances = self.instances.read().unwrap_or_else(|e| e.into_inner());
    instances
      .get(id)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(id.to_string()))
  }

  async fn list(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
    let instances = self.instances.read().unwrap_or_else(|e| e.into_inner());
    Ok(instances.values().cloned().collect())
  }
}
