use thiserror::Error;

/// Errors raised by the template layer.
#[derive(Debug, Error)]
pub enum TemplateError {
  /// The template itself is malformed.
  #[error("template parse error: {0}")]
  Parse(String),

  /// The template failed while evaluating against the data tree.
  #[error("template execution error: {0}")]
  Execute(String),
}

impl From<minijinja::Error> for TemplateError {
  fn from(err: minijinja::Error) -> Self {
    match err.kind() {
      minijinja::ErrorKind::SyntaxError => TemplateError::Parse(err.to_string()),
      _ => TemplateError::Execute(err.to_string()),
    }
  }
}
