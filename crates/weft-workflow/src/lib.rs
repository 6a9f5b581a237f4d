//! Compiled workflow model.
//!
//! `weft-config` holds the serde-facing definition types; this crate holds
//! the model the orchestrator executes. Compilation validates the definition,
//! parses durations, and replaces the untyped step bag with a tagged
//! `StepKind` variant per step type.

mod compile;
mod error;
mod retry;
mod step;
mod workflow;

pub use compile::compile;
pub use error::CompileError;
pub use retry::{Backoff, RetryPolicy};
pub use step::{Branch, JoinMode, LoopSpec, ParallelSpec, Step, StepKind, SubFlowSpec};
pub use workflow::Workflow;
