use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::http::HttpAction;
use crate::log::LogAction;
use crate::shell::ShellAction;
use crate::Action;

/// Name-to-capability table. Lookup of an unknown name is surfaced by the
/// engine as a hard step error.
#[derive(Default)]
pub struct ActionRegistry {
  actions: RwLock<HashMap<String, Arc<dyn Action>>>,
}

impl ActionRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry preloaded with the built-in actions.
  pub fn with_builtins() -> Self {
    let registry = Self::new();
    registry.register("log.info", Arc::new(LogAction));
    registry.register("http.request", Arc::new(HttpAction::new()));
    registry.register("shell.exec", Arc::new(ShellAction));
    registry
  }

  /// Register an action, replacing any prior action of the same name.
  pub fn register(&self, name: impl Into<String>, action: Arc<dyn Action>) {
    let name = name.into();
    info!(name = %name, "action registered");
    let mut actions = self.actions.write().unwrap_or_else(|e| e.into_inner());
    actions.insert(name, action);
  }

  /// Look up an action by name.
  pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
    let actions = self.actions.read().unwrap_or_else(|e| e.into_inner());
    actions.get(name).cloned()
  }

  /// Names of all registered actions.
  pub fn names(&self) -> Vec<String> {
    let actions = self.actions.read().unwrap_or_else(|e| e.into_inner());
    actions.keys().cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtins_are_registered() {
    let registry = ActionRegistry::with_builtins();
    assert!(registry.get("log.info").is_some());
    assert!(registry.get("http.request").is_some());
    assert!(registry.get("shell.exec").is_some());
  }

  #[test]
  fn test_unknown_action_lookup() {
    let registry = ActionRegistry::with_builtins();
    assert!(registry.get("does.not.exist").is_none());
  }

  #[test]
  fn test_registration_replaces() {
    let registry = ActionRegistry::new();
    registry.register("log.info", Arc::new(LogAction));
    registry.register("log.info", Arc::new(LogAction));
    assert_eq!(registry.names().len(), 1);
  }
}
