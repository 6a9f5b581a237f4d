use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ActionError;
use crate::{Action, ActionInput, ActionOutput};

/// `shell.exec` — run a command.
///
/// Input: `command` (required; whitespace-split argv, no shell
/// interpretation), optional `working_dir`, `timeout` in seconds (default
/// 30), and an `env` mapping. Output: `command`, `output` (combined
/// stdout+stderr), `exit_code`, `success`. A non-zero exit is an error so
/// step retry policies apply.
pub struct ShellAction;

#[async_trait]
impl Action for ShellAction {
  async fn execute(
    &self,
    cancel: &CancellationToken,
    input: &ActionInput,
  ) -> Result<ActionOutput, ActionError> {
    let command = input
      .get("command")
      .and_then(|v| v.as_str())
      .filter(|s| !s.trim().is_empty())
      .ok_or(ActionError::MissingParameter("command"))?;

    let parts: Vec<&str> = command.split_whitespace().collect();
    let (program, args) = match parts.split_first() {
      Some(split) => split,
      None => return Err(ActionError::MissingParameter("command")),
    };

    let timeout_secs = input
      .get("timeout")
      .and_then(|v| v.as_f64())
      .filter(|t| *t > 0.0)
      .unwrap_or(30.0);
    let timeout = Duration::from_secs_f64(timeout_secs);

    let mut cmd = tokio::process::Command::new(program);
    cmd
      .args(args)
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    if let Some(dir) = input
      .get("working_dir")
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
    {
      cmd.current_dir(dir);
    }

    if let Some(env) = input.get("env").and_then(|v| v.as_object()) {
      for (key, value) in env {
        let value = match value {
          serde_json::Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        cmd.env(key, value);
      }
    }

    info!(command = %command, "executing shell command");

    let result = tokio::select! {
      result = tokio::time::timeout(timeout, cmd.output()) => result,
      _ = cancel.cancelled() => return Err(ActionError::Cancelled),
    };

    let captured = match result {
      Ok(output) => output?,
      Err(_) => return Err(ActionError::CommandTimeout(timeout)),
    };

    let mut combined = String::from_utf8_lossy(&captured.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&captured.stderr));

    let exit_code = captured.status.code().unwrap_or(-1);
    let success = captured.status.success();

    let mut output = ActionOutput::new();
    output.insert("command".to_string(), json!(command));
    output.insert("output".to_string(), json!(combined));
    output.insert("exit_code".to_string(), json!(exit_code));
    output.insert("success".to_string(), json!(success));

    if !success {
      error!(command = %command, exit_code, "shell command failed");
      return Err(ActionError::CommandFailed {
        exit_code,
        output: combined,
      });
    }

    info!(command = %command, "shell command completed");
    Ok(output)
  }
}
