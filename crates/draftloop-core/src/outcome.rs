use serde::{Deserialize, Serialize};
use std::time::Duration;

use draftloop_evaluator::{EvaluationResult, SubScores};
use draftloop_generator::Candidate;

use crate::IterationRecord;

/// The final result of an orchestration run. Produced once, at loop
/// termination, in every case except total failure across all iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub success: bool,
    /// Whether the quality gate passed (evaluator approval AND threshold)
    pub approved: bool,
    pub candidate: Candidate,
    pub quality_score: f64,
    /// Per-axis scores from the deciding evaluation; None in quick mode
    pub sub_scores: Option<SubScores>,
    /// Iterations performed (including failed ones)
    pub iterations: usize,
    pub max_iterations_reached: bool,
    pub history: Vec<IterationRecord>,
    pub total_duration_secs: f64,
}

impl OrchestrationResult {
    /// Result for a candidate that passed the quality gate
    pub(crate) fn approved(
        candidate: Candidate,
        evaluation: &EvaluationResult,
        iterations: usize,
        history: Vec<IterationRecord>,
        duration: Duration,
    ) -> Self {
        Self {
            success: true,
            approved: true,
            candidate,
            quality_score: evaluation.score,
            sub_scores: Some(evaluation.sub_scores),
            iterations,
            max_iterations_reached: false,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    /// Best-effort result when the loop ended without an approval: the best
    /// candidate seen, flagged with `max_iterations_reached`.
    pub(crate) fn best_effort(
        candidate: Candidate,
        evaluation: &EvaluationResult,
        approval_threshold: f64,
        iterations: usize,
        history: Vec<IterationRecord>,
        duration: Duration,
    ) -> Self {
        Self {
            success: true,
            approved: evaluation.score >= approval_threshold,
            candidate,
            quality_score: evaluation.score,
            sub_scores: Some(evaluation.sub_scores),
            iterations,
            max_iterations_reached: true,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    /// Result of a single-pass quick run: never evaluated, always approved,
    /// quality taken from the candidate's own confidence.
    pub(crate) fn quick(
        candidate: Candidate,
        history: Vec<IterationRecord>,
        duration: Duration,
    ) -> Self {
        let quality_score = candidate.confidence;
        Self {
            success: true,
            approved: true,
            candidate,
            quality_score,
            sub_scores: None,
            iterations: 1,
            max_iterations_reached: false,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }
}
