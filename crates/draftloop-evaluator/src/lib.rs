mod evaluator;
mod feedback;
mod prompts;
mod result;

pub use evaluator::{Evaluate, EvaluationError, Evaluator};
pub use feedback::format_feedback;
pub use prompts::EvaluatorPrompts;
pub use result::{EvaluationResult, SubScores};
