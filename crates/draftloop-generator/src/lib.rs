mod generator;
mod prompts;
mod types;

pub use generator::{Generate, GenerationError, Generator};
pub use prompts::GeneratorPrompts;
pub use types::{Candidate, CollectedInput, TaskSpec};
