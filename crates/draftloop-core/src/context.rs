use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use draftloop_evaluator::EvaluationResult;
use draftloop_generator::Candidate;

/// Phase of the loop state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Init,
    Generating,
    Evaluating,
    Refining,
    Approved,
    MaxIterationsReached,
    Failed,
}

/// Record of a single iteration, success or failure. Appended every
/// iteration and never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub candidate_summary: Option<String>,
    pub evaluation_summary: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl IterationRecord {
    pub fn success(iteration: usize, candidate: &Candidate, evaluation: &EvaluationResult) -> Self {
        Self {
            iteration,
            candidate_summary: Some(candidate.short_description()),
            evaluation_summary: Some(evaluation.short_description()),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(iteration: usize, error: &str) -> Self {
        Self {
            iteration,
            candidate_summary: None,
            evaluation_summary: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }
}

/// Per-run accumulator for the loop. Each orchestration run owns its own
/// context; nothing here is shared across runs.
#[derive(Debug)]
pub struct RunContext {
    /// Current iteration (1-indexed)
    pub iteration: usize,
    pub max_iterations: usize,
    pub approval_threshold: f64,
    pub phase: LoopPhase,
    pub history: Vec<IterationRecord>,
    /// Formatted feedback for the next generator call
    pub last_feedback: Option<String>,
    best: Option<(Candidate, EvaluationResult)>,
    started_at: Instant,
}

impl RunContext {
    pub fn new(max_iterations: usize, approval_threshold: f64) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            approval_threshold,
            phase: LoopPhase::Init,
            history: Vec::new(),
            last_feedback: None,
            best: None,
            started_at: Instant::now(),
        }
    }

    pub fn push_record(&mut self, record: IterationRecord) {
        self.history.push(record);
    }

    /// Advance the loop state machine, tracing the transition
    pub fn set_phase(&mut self, phase: LoopPhase) {
        debug!(iteration = self.iteration, from = ?self.phase, to = ?phase, "Loop phase");
        self.phase = phase;
    }

    pub fn set_feedback(&mut self, feedback: String) {
        self.last_feedback = Some(feedback);
    }

    /// Track the best candidate seen so far. Only a strictly greater score
    /// replaces the current best; ties keep the earlier candidate.
    pub fn observe(&mut self, candidate: Candidate, evaluation: EvaluationResult) {
        let replaces = match &self.best {
            Some((_, best_eval)) => evaluation.score > best_eval.score,
            None => true,
        };
        if replaces {
            self.best = Some((candidate, evaluation));
        }
    }

    pub fn has_best(&self) -> bool {
        self.best.is_some()
    }

    pub fn best_score(&self) -> f64 {
        self.best
            .as_ref()
            .map(|(_, evaluation)| evaluation.score)
            .unwrap_or(0.0)
    }

    /// Consume the context, yielding the best candidate and its evaluation
    /// along with the accumulated history. None if no iteration succeeded.
    pub fn into_best(
        self,
    ) -> Option<(Candidate, EvaluationResult, Vec<IterationRecord>, Duration)> {
        let duration = self.started_at.elapsed();
        let (candidate, evaluation) = self.best?;
        Some((candidate, evaluation, self.history, duration))
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}
