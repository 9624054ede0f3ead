mod context;
mod error;
mod orchestrator;
mod outcome;

pub use context::{IterationRecord, LoopPhase, RunContext};
pub use error::LoopError;
pub use orchestrator::{Orchestrator, OrchestratorOptions};
pub use outcome::OrchestrationResult;
