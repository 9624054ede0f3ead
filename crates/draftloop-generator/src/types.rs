use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque description of the artifact to synthesize: what it is for and what
/// shape its structured data should take. Passed through to prompts, never
/// interpreted structurally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub purpose: String,
    pub output_shape: Value,
}

impl TaskSpec {
    pub fn new(purpose: impl Into<String>, output_shape: Value) -> Self {
        Self {
            purpose: purpose.into(),
            output_shape,
        }
    }
}

/// Facts gathered upstream that the artifact must be built from. The loop
/// treats this as an opaque nested structure; only the evaluator judges
/// whether a candidate stayed faithful to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedInput {
    pub facts: Value,
}

impl CollectedInput {
    pub fn new(facts: Value) -> Self {
        Self { facts }
    }
}

/// One generated attempt at the target artifact. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub summary: String,
    /// Machine-readable artifact data, shaped by the task spec
    pub structured_data: Value,
    /// Human-viewable rendering of the same artifact
    pub rendered_output: String,
    /// Self-reported confidence, 1-10
    pub confidence: f64,
    pub notes: String,
    /// Iteration that produced this candidate (1-indexed)
    pub iteration: usize,
}

impl Candidate {
    /// Short description for history records and logging
    pub fn short_description(&self) -> String {
        format!("{} (confidence {:.1}/10)", self.title, self.confidence)
    }
}
