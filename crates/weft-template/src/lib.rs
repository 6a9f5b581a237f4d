//! Template resolution using minijinja.
//!
//! Templates are resolved against a data tree rooted at
//! `{ "event": { "type", "payload", "metadata", "timestamp" }, "variables": {...} }`.
//! Unknown paths render as the empty string. A fixed helper set is exposed as
//! template functions:
//!
//! ```json
//! { "message": "Welcome {{ event.payload.name }}!",
//!   "if": "{{ eq(event.payload.tier, 'premium') }}" }
//! ```

mod error;
mod helpers;
mod resolver;

pub use error::TemplateError;
pub use resolver::{is_truthy, TemplateResolver};
