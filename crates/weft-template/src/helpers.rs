//! Helper functions exposed to templates.

use minijinja::value::Value;
use minijinja::Environment;

/// Register the fixed helper set on a template environment.
pub(crate) fn register(env: &mut Environment<'static>) {
  env.add_function("default", |d: Value, v: Value| {
    if is_empty_value(&v) {
      d
    } else {
      v
    }
  });
  env.add_function("empty", |v: Value| is_empty_value(&v));
  env.add_function("not", |v: Value| !v.is_true());
  env.add_function("eq", |a: Value, b: Value| a == b);
  env.add_function("ne", |a: Value, b: Value| a != b);
  env.add_function("contains", |haystack: String, needle: String| {
    haystack.contains(&needle)
  });
}

/// Empty means: missing, nil, length-0 string/container, zero numeric, false.
fn is_empty_value(v: &Value) -> bool {
  if v.is_undefined() || v.is_none() {
    return true;
  }

  match serde_json::to_value(v) {
    Ok(serde_json::Value::Null) => true,
    Ok(serde_json::Value::Bool(b)) => !b,
    Ok(serde_json::Value::Number(n)) => n.as_f64() == Some(0.0),
    Ok(serde_json::Value::String(s)) => s.is_empty(),
    Ok(serde_json::Value::Array(a)) => a.is_empty(),
    Ok(serde_json::Value::Object(o)) => o.is_empty(),
    Err(_) => false,
  }
}
