//! Action capabilities.
//!
//! An action is a named executable capability with a single operation:
//! `execute(cancel, input) -> output`. Steps reference actions by registry
//! key; new actions are added by registering capability instances, never by
//! subclassing.

mod error;
mod http;
mod log;
mod registry;
mod shell;

pub use error::ActionError;
pub use http::HttpAction;
pub use log::LogAction;
pub use registry::ActionRegistry;
pub use shell::ShellAction;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Input mapping handed to an action after template resolution.
pub type ActionInput = serde_json::Map<String, serde_json::Value>;

/// Output mapping returned by an action.
pub type ActionOutput = serde_json::Map<String, serde_json::Value>;

/// A named executable capability consumed by workflow steps.
#[async_trait]
pub trait Action: Send + Sync {
  /// Execute with the materialized input. Implementations are expected to
  /// honor the cancellation token across I/O.
  async fn execute(
    &self,
    cancel: &CancellationToken,
    input: &ActionInput,
  ) -> Result<ActionOutput, ActionError>;
}
