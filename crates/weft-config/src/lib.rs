//! Workflow definition types for weft.
//!
//! A workflow definition is the declarative, on-disk form of a workflow:
//! a name, the event type that triggers it, and an ordered list of steps.
//! Definitions are validated at load time and compiled into the executable
//! model by `weft-workflow`.

mod enums;
mod error;
mod loader;
mod step;
mod validate;
mod workflow;

pub use enums::{BackoffDef, JoinModeDef, StepType};
pub use error::ValidationError;
pub use loader::{load_from_file, load_from_str};
pub use step::{BranchDef, LoopDef, ParallelDef, RetryDef, StepDef, SubFlowDef};
pub use validate::validate;
pub use workflow::{TriggerDef, WorkflowDef};
