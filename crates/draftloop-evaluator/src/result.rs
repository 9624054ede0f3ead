use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Per-axis quality scores, each 0-10
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    /// Factual accuracy against the collected input
    #[serde(default)]
    pub accuracy: f64,
    /// Completeness against the fields implied by the task spec
    #[serde(default)]
    pub completeness: f64,
    /// Presentation quality of the rendered output
    #[serde(default)]
    pub formatting: f64,
}

impl SubScores {
    fn clamped(self) -> Self {
        Self {
            accuracy: self.accuracy.clamp(0.0, 10.0),
            completeness: self.completeness.clamp(0.0, 10.0),
            formatting: self.formatting.clamp(0.0, 10.0),
        }
    }
}

/// The evaluator's verdict on a single candidate.
///
/// `approved` is the evaluator's independent "ready to ship" judgment; only
/// the orchestrator combines it with the numeric threshold into a final
/// accept decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default)]
    pub approved: bool,
    /// Overall quality, 0-10
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub sub_scores: SubScores,
    /// Concrete, addressable findings, most important first
    #[serde(default)]
    pub issues: Vec<String>,
    /// Prose feedback derived from the issues
    #[serde(default)]
    pub feedback: String,
}

impl EvaluationResult {
    /// Deserialize an evaluation from a located payload, clamping all scores
    /// into range. Missing fields default toward "not approved".
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        let mut result: EvaluationResult = serde_json::from_value(payload)?;
        result.score = result.score.clamp(0.0, 10.0);
        result.sub_scores = result.sub_scores.clamped();
        debug!(
            approved = result.approved,
            score = result.score,
            issues = result.issues.len(),
            "Parsed evaluation payload"
        );
        Ok(result)
    }

    /// Short description for history records and logging
    pub fn short_description(&self) -> String {
        if self.approved {
            format!("APPROVED (score {:.1}/10)", self.score)
        } else if self.issues.is_empty() {
            format!("REVISE (score {:.1}/10)", self.score)
        } else {
            format!(
                "REVISE (score {:.1}/10, {} issues)",
                self.score,
                self.issues.len()
            )
        }
    }
}
