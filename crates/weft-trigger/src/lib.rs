//! Trigger dispatch contract.
//!
//! Concrete event sources (webhook listeners, filesystem watchers, cron
//! schedulers, queue consumers) live outside the engine. This crate defines
//! the contract they all honor: translate the native event into an `Event`
//! with a stable type string, attach source metadata, look up the workflow,
//! and hand execution to the engine on a fresh task so the receive loop is
//! never blocked.

mod conventions;
mod dispatch;
mod error;

pub use conventions::{db_event_type, file_event_type, topic_event_type, FileChange};
pub use dispatch::EventDispatcher;
pub use error::TriggerError;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// An external adapter that observes some source of activity and dispatches
/// events into the engine.
#[async_trait]
pub trait Trigger: Send + Sync {
  /// Run the trigger's receive loop until cancelled.
  async fn run(
    &self,
    dispatcher: EventDispatcher,
    cancel: CancellationToken,
  ) -> Result<(), TriggerError>;
}
