use thiserror::Error;

use draftloop_evaluator::EvaluationError;
use draftloop_generator::GenerationError;

#[derive(Error, Debug)]
pub enum LoopError {
    /// No candidate was ever produced across all allotted iterations.
    /// The only case where the caller gets no result at all.
    #[error("No candidate produced after {iterations} iteration(s): {last_error}")]
    Terminal {
        iterations: usize,
        last_error: String,
    },

    #[error("Run cancelled before any candidate was produced")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure scoped to a single iteration. Recorded in history and subject to
/// the fail-soft policy rather than propagated directly.
#[derive(Error, Debug)]
pub(crate) enum IterationError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}
