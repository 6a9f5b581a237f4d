//! Workflow execution engine.
//!
//! The `Engine` facade owns the event-type to workflow table, the action
//! registry, and the instance store. Each `execute` call drives one workflow
//! instance to a terminal status through the orchestrator: sequential steps
//! with condition gating and retry, parallel branches with join modes,
//! real sub-workflow execution, delays, and bounded loops, persisting the
//! instance after every step transition.

mod engine;
mod error;
mod orchestrator;
mod parallel;

pub use engine::Engine;
pub use error::EngineError;
