use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::WorkflowInstance;
use crate::InstanceStore;

/// Reference store: one `<instanceId>.json` document per instance.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so readers never observe a torn document.
pub struct JsonDirStore {
  dir: PathBuf,
}

impl JsonDirStore {
  /// Create a store rooted at `dir`, creating the directory if needed.
  pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir)?;
    Ok(Self { dir })
  }

  fn instance_path(&self, id: &str) -> PathBuf {
    self.dir.join(format!("{}.json", id))
  }
}

#[async_trait]
impl InstanceStore for JsonDirStore {
  async fn save(&self, instance: &WorkflowInstance) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(instance)?;
    let tmp = self.dir.join(format!(".{}.json.tmp", instance.id));
    tokio::fs::write(&tmp, &data).await?;
    tokio::fs::rename(&tmp, self.instance_path(&instance.id)).await?;
    Ok(())
  }

  async fn get(&self, id: &str) -> Result<WorkflowInstance, StoreError> {
    let data = match tokio::fs::read(self.instance_path(id)).await {
      Ok(data) => data,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(StoreError::NotFound(id.to_string()));
      }
      Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&data)?)
  }

  async fn list(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
    let mut instances = Vec::new();
    let mut entries = tokio::fs::read_dir(&self.dir).await?;

    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      // Skip documents that cannot be read or parsed.
      let Ok(data) = tokio::fs::read(&path).await else {
        continue;
      };
      if let Ok(instance) = serde_json::from_slice::<WorkflowInstance>(&data) {
        instances.push(instance);
      }
    }

    Ok(instances)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{Event, EventContext, InstanceStatus, StepExecution, StepStatus};
  use chrono::Utc;

  fn sample_instance(id: &str) -> WorkflowInstance {
    WorkflowInstance {
      id: id.to_string(),
      workflow_name: "wf".to_string(),
      status: InstanceStatus::Completed,
      start_time: Utc::now(),
      end_time: Some(Utc::now()),
      context: EventContext::new(Event::new("user.created")),
      steps: vec![StepExecution {
        name: "step1".to_string(),
        status: StepStatus::Completed,
        start_time: Utc::now(),
        end_time: Some(Utc::now()),
        input: serde_json::Map::new(),
        output: None,
        error: None,
        retries: 0,
      }],
      error: None,
      parent_id: None,
      sub_instances: Vec::new(),
    }
  }

  #[tokio::test]
  async fn test_save_and_get_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonDirStore::new(dir.path()).unwrap();

    let id = uuid::Uuid::new_v4().to_string();
    let instance = sample_instance(&id);
    store.save(&instance).await.unwrap();

    let loaded = store.get(&id).await.unwrap();
    assert_eq!(loaded.id, instance.id);
    assert_eq!(loaded.status, InstanceStatus::Completed);
    assert_eq!(loaded.steps.len(), 1);
    assert_eq!(loaded.steps[0].status, StepStatus::Completed);
  }

  #[tokio::test]
  async fn test_save_is_an_upsert() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonDirStore::new(dir.path()).unwrap();

    let id = uuid::Uuid::new_v4().to_string();
    let mut instance = sample_instance(&id);
    store.save(&instance).await.unwrap();

    instance.status = InstanceStatus::Failed;
    store.save(&instance).await.unwrap();

    let loaded = store.get(&id).await.unwrap();
    assert_eq!(loaded.status, InstanceStatus::Failed);
  }

  #[tokio::test]
  async fn test_get_missing_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonDirStore::new(dir.path()).unwrap();

    let err = store.get("nope").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
  }

  #[tokio::test]
  async fn test_list_skips_unparseable_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonDirStore::new(dir.path()).unwrap();

    store.save(&sample_instance("a")).await.unwrap();
    store.save(&sample_instance("b")).await.unwrap();
    tokio::fs::write(dir.path().join("garbage.json"), b"not json")
      .await
      .unwrap();

    let instances = store.list().await.unwrap();
    assert_eq!(instances.len(), 2);
  }
}
