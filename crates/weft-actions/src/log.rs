use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ActionError;
use crate::{Action, ActionInput, ActionOutput};

/// `log.info` — emit a message through the process tracing subscriber.
///
/// Input: `message` (required), `level` in debug/info/warn/error (default
/// info), optional `fields` mapping attached as a structured field.
pub struct LogAction;

#[async_trait]
impl Action for LogAction {
  async fn execute(
    &self,
    _cancel: &CancellationToken,
    input: &ActionInput,
  ) -> Result<ActionOutput, ActionError> {
    let message = input
      .get("message")
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
      .ok_or(ActionError::MissingParameter("message"))?;

    let level = input
      .get("level")
      .and_then(|v| v.as_str())
      .unwrap_or("info");

    let fields = input
      .get("fields")
      .cloned()
      .unwrap_or_else(|| json!({}));

    match level {
      "debug" => debug!(fields = %fields, "{}", message),
      "warn" | "warning" => warn!(fields = %fields, "{}", message),
      "error" => error!(fields = %fields, "{}", message),
      _ => info!(fields = %fields, "{}", message),
    }

    let mut output = ActionOutput::new();
    output.insert("message".to_string(), json!(message));
    output.insert("level".to_string(), json!(level));
    output.insert("success".to_string(), json!(true));
    Ok(output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_log_emits_and_echoes() {
    let action = LogAction;
    let cancel = CancellationToken::new();
    let input = json!({ "message": "hello", "level": "warn" })
      .as_object()
      .cloned()
      .unwrap();

    let output = action.execute(&cancel, &input).await.unwrap();
    assert_eq!(output["message"], "hello");
    assert_eq!(output["level"], "warn");
    assert_eq!(output["success"], true);
  }

  #[tokio::test]
  async fn test_log_requires_message() {
    let action = LogAction;
    let cancel = CancellationToken::new();
    let input = json!({ "level": "info" }).as_object().cloned().unwrap();

    let err = action.execute(&cancel, &input).await.unwrap_err();
    assert!(matches!(err, ActionError::MissingParameter("message")));
  }

  #[tokio::test]
  async fn test_log_unknown_level_falls_back_to_info() {
    let action = LogAction;
    let cancel = CancellationToken::new();
    let input = json!({ "message": "hi", "level": "loud" })
      .as_object()
      .cloned()
      .unwrap();

    let output = action.execute(&cancel, &input).await.unwrap();
    assert_eq!(output["level"], "loud");
    assert_eq!(output["success"], true);
  }
}
