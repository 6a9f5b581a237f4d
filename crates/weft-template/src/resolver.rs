use minijinja::{Environment, UndefinedBehavior};

use crate::error::TemplateError;
use crate::helpers;

/// A pure, stateless template resolver.
///
/// One resolver can serve any number of concurrent executions; all state
/// lives in the data tree passed to each call.
pub struct TemplateResolver {
  env: Environment<'static>,
}

impl Default for TemplateResolver {
  fn default() -> Self {
    Self::new()
  }
}

impl TemplateResolver {
  pub fn new() -> Self {
    let mut env = Environment::new();
    // Unknown paths resolve to the empty string, including nested access.
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    helpers::register(&mut env);
    Self { env }
  }

  /// Render a template string against the data tree.
  pub fn render(
    &self,
    template: &str,
    data: &serde_json::Value,
  ) -> Result<String, TemplateError> {
    self.env.render_str(template, data).map_err(Into::into)
  }

  /// Recursively resolve templates inside a JSON value.
  ///
  /// Strings containing template syntax are rendered; arrays and objects are
  /// walked; numbers, booleans, and nulls pass through unchanged. A string
  /// that is a single pure `{{ ... }}` expression re-parses as JSON so that
  /// numbers and structured values survive resolution.
  pub fn render_value(
    &self,
    value: &serde_json::Value,
    data: &serde_json::Value,
  ) -> Result<serde_json::Value, TemplateError> {
    match value {
      serde_json::Value::String(s) => {
        if !s.contains("{{") && !s.contains("{%") {
          return Ok(value.clone());
        }
        let rendered = self.render(s, data)?;
        if is_pure_template(s) {
          if let Ok(parsed) = serde_json::from_str(&rendered) {
            return Ok(parsed);
          }
        }
        Ok(serde_json::Value::String(rendered))
      }
      serde_json::Value::Array(items) => {
        let resolved: Result<Vec<_>, _> =
          items.iter().map(|v| self.render_value(v, data)).collect();
        Ok(serde_json::Value::Array(resolved?))
      }
      serde_json::Value::Object(obj) => {
        let mut resolved = serde_json::Map::new();
        for (k, v) in obj {
          resolved.insert(k.clone(), self.render_value(v, data)?);
        }
        Ok(serde_json::Value::Object(resolved))
      }
      _ => Ok(value.clone()),
    }
  }

  /// Resolve every value of a mapping, preserving key order.
  pub fn render_map(
    &self,
    map: &serde_json::Map<String, serde_json::Value>,
    data: &serde_json::Value,
  ) -> Result<serde_json::Map<String, serde_json::Value>, TemplateError> {
    let mut resolved = serde_json::Map::new();
    for (k, v) in map {
      resolved.insert(k.clone(), self.render_value(v, data)?);
    }
    Ok(resolved)
  }
}

/// Truthiness of a resolved condition string.
///
/// Truthy iff non-empty and not one of `false`, `0`, `no`.
pub fn is_truthy(resolved: &str) -> bool {
  !matches!(resolved.trim(), "" | "false" | "0" | "no")
}

/// Check if a string is a single pure template expression.
fn is_pure_template(s: &str) -> bool {
  let trimmed = s.trim();
  trimmed.starts_with("{{")
    && trimmed.ends_with("}}")
    && trimmed.matches("{{").count() == 1
    && trimmed.matches("}}").count() == 1
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn data() -> serde_json::Value {
    json!({
      "event": {
        "type": "user.created",
        "payload": { "name": "Ada", "tier": "premium", "count": 3 },
        "metadata": { "source": "test" },
        "timestamp": 1704067200
      },
      "variables": {
        "step1": { "field": "X" }
      }
    })
  }

  #[test]
  fn test_interpolation() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render("Welcome {{ event.payload.name }}!", &data())
      .unwrap();
    assert_eq!(out, "Welcome Ada!");
  }

  #[test]
  fn test_variables_path() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render("{{ variables.step1.field }}", &data())
      .unwrap();
    assert_eq!(out, "X");
  }

  #[test]
  fn test_unknown_path_is_empty() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render("{{ variables.missing.deeply.nested }}", &data())
      .unwrap();
    assert_eq!(out, "");
  }

  #[test]
  fn test_parse_error() {
    let resolver = TemplateResolver::new();
    let err = resolver.render("{{ event.payload.name", &data()).unwrap_err();
    assert!(matches!(err, TemplateError::Parse(_)));
  }

  #[test]
  fn test_eq_helper() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render("{{ eq(event.payload.tier, 'premium') }}", &data())
      .unwrap();
    assert_eq!(out, "true");

    let out = resolver
      .render("{{ eq(event.payload.tier, 'basic') }}", &data())
      .unwrap();
    assert_eq!(out, "false");
  }

  #[test]
  fn test_ne_helper() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render("{{ ne(event.payload.tier, 'basic') }}", &data())
      .unwrap();
    assert_eq!(out, "true");
  }

  #[test]
  fn test_default_helper() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render("{{ default('anonymous', event.payload.missing) }}", &data())
      .unwrap();
    assert_eq!(out, "anonymous");

    let out = resolver
      .render("{{ default('anonymous', event.payload.name) }}", &data())
      .unwrap();
    assert_eq!(out, "Ada");
  }

  #[test]
  fn test_empty_helper() {
    let resolver = TemplateResolver::new();
    assert_eq!(resolver.render("{{ empty('') }}", &data()).unwrap(), "true");
    assert_eq!(resolver.render("{{ empty(0) }}", &data()).unwrap(), "true");
    assert_eq!(resolver.render("{{ empty(false) }}", &data()).unwrap(), "true");
    assert_eq!(
      resolver
        .render("{{ empty(event.payload.name) }}", &data())
        .unwrap(),
      "false"
    );
  }

  #[test]
  fn test_not_helper() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render("{{ not(eq(event.payload.tier, 'premium')) }}", &data())
      .unwrap();
    assert_eq!(out, "false");
  }

  #[test]
  fn test_contains_helper() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render("{{ contains(event.payload.name, 'da') }}", &data())
      .unwrap();
    assert_eq!(out, "true");
  }

  #[test]
  fn test_render_value_pure_template_keeps_numbers() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render_value(&json!("{{ event.payload.count }}"), &data())
      .unwrap();
    assert_eq!(out, json!(3));
  }

  #[test]
  fn test_render_value_mixed_template_stays_string() {
    let resolver = TemplateResolver::new();
    let out = resolver
      .render_value(&json!("count={{ event.payload.count }}"), &data())
      .unwrap();
    assert_eq!(out, json!("count=3"));
  }

  #[test]
  fn test_render_value_structured_passthrough() {
    let resolver = TemplateResolver::new();
    let value = json!({ "nested": { "greeting": "hi {{ event.payload.name }}" }, "n": 7 });
    let out = resolver.render_value(&value, &data()).unwrap();
    assert_eq!(out, json!({ "nested": { "greeting": "hi Ada" }, "n": 7 }));
  }

  #[test]
  fn test_truthiness() {
    assert!(is_truthy("true"));
    assert!(is_truthy("1"));
    assert!(is_truthy("yes"));
    assert!(is_truthy("anything"));
    assert!(!is_truthy(""));
    assert!(!is_truthy("false"));
    assert!(!is_truthy("0"));
    assert!(!is_truthy("no"));
    assert!(!is_truthy("  false  "));
  }
}
