use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::ActionError;
use crate::{Action, ActionInput, ActionOutput};

/// `http.request` — perform an HTTP request.
///
/// Input: `url` (required), `method` (default GET), optional `headers`
/// mapping and `body` (serialized as JSON). Output: `status_code`,
/// `headers`, `body` (parsed as JSON when possible, else a string), and
/// `success` iff the status is in [200, 300). A non-2xx status is an error
/// so step retry policies apply.
pub struct HttpAction {
  client: reqwest::Client,
}

impl Default for HttpAction {
  fn default() -> Self {
    Self::new()
  }
}

impl HttpAction {
  pub fn new() -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .unwrap_or_else(|_| reqwest::Client::new());
    Self { client }
  }
}

#[async_trait]
impl Action for HttpAction {
  async fn execute(
    &self,
    cancel: &CancellationToken,
    input: &ActionInput,
  ) -> Result<ActionOutput, ActionError> {
    let url = input
      .get("url")
      .and_then(|v| v.as_str())
      .filter(|s| !s.is_empty())
      .ok_or(ActionError::MissingParameter("url"))?;

    let method = input
      .get("method")
      .and_then(|v| v.as_str())
      .unwrap_or("GET");
    let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|e| {
      ActionError::InvalidParameter {
        name: "method",
        message: e.to_string(),
      }
    })?;

    let mut request = self.client.request(method.clone(), url);

    if let Some(headers) = input.get("headers").and_then(|v| v.as_object()) {
      for (key, value) in headers {
        let value = match value {
          serde_json::Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        request = request.header(key, value);
      }
    }

    if let Some(body) = input.get("body") {
      request = request.json(body);
    }

    info!(method = %method, url = %url, "executing http request");

    let response = tokio::select! {
      response = request.send() => response?,
      _ = cancel.cancelled() => return Err(ActionError::Cancelled),
    };

    let status = response.status();

    let mut headers = serde_json::Map::new();
    for (key, value) in response.headers() {
      if let Ok(value) = value.to_str() {
        headers
          .entry(key.as_str().to_string())
          .or_insert_with(|| json!(value));
      }
    }

    let text = response.text().await?;
    let body = if text.is_empty() {
      serde_json::Value::Null
    } else {
      serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
    };

    info!(url = %url, status_code = status.as_u16(), "http request completed");

    let mut output = ActionOutput::new();
    output.insert("status_code".to_string(), json!(status.as_u16()));
    output.insert("headers".to_string(), serde_json::Value::Object(headers));
    output.insert("body".to_string(), body);
    output.insert("success".to_string(), json!(status.is_success()));

    if !status.is_success() {
      return Err(ActionError::HttpStatus {
        status: status.as_u16(),
      });
    }

    Ok(output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_url_is_required() {
    let action = HttpAction::new();
    let cancel = CancellationToken::new();
    let input = json!({ "method": "GET" }).as_object().cloned().unwrap();

    let err = action.execute(&cancel, &input).await.unwrap_err();
    assert!(matches!(err, ActionError::MissingParameter("url")));
  }

  #[tokio::test]
  async fn test_invalid_method_is_rejected() {
    let action = HttpAction::new();
    let cancel = CancellationToken::new();
    let input = json!({ "url": "http://localhost:1/", "method": "NOT A METHOD" })
      .as_object()
      .cloned()
      .unwrap();

    let err = action.execute(&cancel, &input).await.unwrap_err();
    assert!(matches!(err, ActionError::InvalidParameter { name: "method", .. }));
  }
}
