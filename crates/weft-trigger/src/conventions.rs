//! Event-type conventions shared across trigger implementations.

/// Filesystem change kinds and their event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
  Created,
  Modified,
  Deleted,
  Renamed,
  Chmod,
}

/// Event type for a filesystem change.
pub fn file_event_type(change: FileChange) -> &'static str {
  match change {
    FileChange::Created => "file.created",
    FileChange::Modified => "file.modified",
    FileChange::Deleted => "file.deleted",
    FileChange::Renamed => "file.renamed",
    FileChange::Chmod => "file.chmod",
  }
}

/// Event type for a database change feed row: `db.<table>.<op>`.
pub fn db_event_type(table: &str, op: &str) -> String {
  format!("db.{}.{}", table, op)
}

/// Derive an event type from a message topic when no explicit event-type
/// header is present: `user-events` becomes `user.event`.
pub fn topic_event_type(topic: &str) -> String {
  let mut parts: Vec<String> = topic.split('-').map(str::to_string).collect();
  if parts.len() < 2 {
    return topic.to_string();
  }
  if let Some(last) = parts.last_mut() {
    if last.len() > 1 && last.ends_with('s') {
      last.pop();
    }
  }
  parts.join(".")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_file_event_types() {
    assert_eq!(file_event_type(FileChange::Created), "file.created");
    assert_eq!(file_event_type(FileChange::Chmod), "file.chmod");
  }

  #[test]
  fn test_db_event_type() {
    assert_eq!(db_event_type("users", "insert"), "db.users.insert");
  }

  #[test]
  fn test_topic_event_type() {
    assert_eq!(topic_event_type("user-events"), "user.event");
    assert_eq!(topic_event_type("order-status-updates"), "order.status.update");
    assert_eq!(topic_event_type("payments"), "payments");
  }
}
