use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use draftloop_completion::{CompletionError, ExtractError};
use draftloop_core::{LoopError, Orchestrator, OrchestratorOptions};
use draftloop_evaluator::{Evaluate, EvaluationError, EvaluationResult, SubScores};
use draftloop_generator::{Candidate, CollectedInput, Generate, GenerationError, TaskSpec};
use draftloop_logging::{LogFormat, Logger};

// ============================================================
// Scripted test doubles
// ============================================================

/// Generator that replays a scripted sequence of outcomes and records the
/// feedback it was handed on each call.
struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<Candidate, GenerationError>>>,
    feedback_seen: Mutex<Vec<Option<String>>>,
}

impl ScriptedGenerator {
    fn new(script: Vec<Result<Candidate, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            feedback_seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.feedback_seen.lock().unwrap().len()
    }

    fn feedback_at(&self, call: usize) -> Option<String> {
        self.feedback_seen.lock().unwrap()[call].clone()
    }
}

#[async_trait]
impl Generate for ScriptedGenerator {
    async fn generate(
        &self,
        _spec: &TaskSpec,
        _input: &CollectedInput,
        feedback: Option<&str>,
        _iteration: usize,
    ) -> Result<Candidate, GenerationError> {
        self.feedback_seen
            .lock()
            .unwrap()
            .push(feedback.map(String::from));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("generator called more times than scripted")
    }
}

/// Evaluator that replays a scripted sequence of verdicts.
struct ScriptedEvaluator {
    script: Mutex<VecDeque<Result<EvaluationResult, EvaluationError>>>,
    calls: Mutex<usize>,
}

impl ScriptedEvaluator {
    fn new(script: Vec<Result<EvaluationResult, EvaluationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Evaluate for ScriptedEvaluator {
    async fn evaluate(
        &self,
        _spec: &TaskSpec,
        _input: &CollectedInput,
        _candidate: &Candidate,
        _iteration: usize,
    ) -> Result<EvaluationResult, EvaluationError> {
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("evaluator called more times than scripted")
    }
}

// ============================================================
// Helpers
// ============================================================

fn draft(iteration: usize, confidence: f64) -> Candidate {
    Candidate {
        title: format!("Draft {}", iteration),
        summary: "a scripted draft".to_string(),
        structured_data: json!({"field": iteration}),
        rendered_output: "<p>draft</p>".to_string(),
        confidence,
        notes: String::new(),
        iteration,
    }
}

fn verdict(score: f64, approved: bool, issues: Vec<&str>) -> EvaluationResult {
    EvaluationResult {
        approved,
        score,
        sub_scores: SubScores {
            accuracy: score,
            completeness: score,
            formatting: score,
        },
        issues: issues.into_iter().map(String::from).collect(),
        feedback: String::new(),
    }
}

fn parse_failure() -> GenerationError {
    GenerationError::Parse(ExtractError::NoPayload)
}

fn transport_failure() -> EvaluationError {
    EvaluationError::Completion(CompletionError::Transport("connection reset".to_string()))
}

fn spec_and_input() -> (TaskSpec, CollectedInput) {
    (
        TaskSpec::new("synthesize a project summary", json!({"name": "string"})),
        CollectedInput::new(json!({"name": "Apollo", "deadline": "2026-10-01"})),
    )
}

fn logger() -> Arc<Logger> {
    Arc::new(Logger::new(LogFormat::Compact))
}

// ============================================================
// End-to-end loop scenarios
// ============================================================

#[tokio::test]
async fn scenario_a_second_iteration_approved() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![Ok(draft(1, 6.0)), Ok(draft(2, 8.0))]);
    let evaluator = ScriptedEvaluator::new(vec![
        Ok(verdict(6.0, false, vec!["summary too thin"])),
        Ok(verdict(9.0, true, vec![])),
    ]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert!(result.approved);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.quality_score, 9.0);
    assert!(!result.max_iterations_reached);
    assert_eq!(result.candidate.iteration, 2);
    Ok(())
}

#[tokio::test]
async fn scenario_b_budget_exhausted_returns_best() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![
        Ok(draft(1, 5.0)),
        Ok(draft(2, 6.0)),
        Ok(draft(3, 7.0)),
    ]);
    let evaluator = ScriptedEvaluator::new(vec![
        Ok(verdict(5.0, false, vec!["a"])),
        Ok(verdict(6.0, false, vec!["b"])),
        Ok(verdict(7.0, false, vec!["c"])),
    ]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert!(!result.approved);
    assert!(result.max_iterations_reached);
    assert_eq!(result.quality_score, 7.0);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.candidate.iteration, 3);
    assert_eq!(result.history.len(), 3);
    Ok(())
}

#[tokio::test]
async fn scenario_c_parse_failure_then_approval() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![Err(parse_failure()), Ok(draft(2, 8.0))]);
    let evaluator = ScriptedEvaluator::new(vec![Ok(verdict(9.0, true, vec![]))]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert!(result.approved);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.history.len(), 2);
    assert!(result.history[0].error.is_some());
    assert!(result.history[0].candidate_summary.is_none());
    assert!(result.history[1].error.is_none());
    assert!(result.history[1].evaluation_summary.is_some());
    Ok(())
}

// ============================================================
// Termination and acceptance policy
// ============================================================

#[tokio::test]
async fn at_most_max_iterations_cycles() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![
        Ok(draft(1, 5.0)),
        Ok(draft(2, 5.0)),
        Ok(draft(3, 5.0)),
    ]);
    let evaluator = ScriptedEvaluator::new(vec![
        Ok(verdict(5.0, false, vec![])),
        Ok(verdict(5.0, false, vec![])),
        Ok(verdict(5.0, false, vec![])),
    ]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert_eq!(generator.calls(), 3);
    assert_eq!(evaluator.calls(), 3);
    assert_eq!(result.iterations, 3);
    Ok(())
}

#[tokio::test]
async fn approval_stops_the_loop_immediately() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![Ok(draft(1, 9.0))]);
    let evaluator = ScriptedEvaluator::new(vec![Ok(verdict(9.5, true, vec![]))]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert!(result.approved);
    assert_eq!(result.iterations, 1);
    assert_eq!(generator.calls(), 1);
    assert_eq!(evaluator.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn approved_flag_alone_does_not_accept() -> anyhow::Result<()> {
    // Evaluator says ship on every iteration, but the score stays below the
    // threshold, so the loop must run to exhaustion
    let generator = ScriptedGenerator::new(vec![
        Ok(draft(1, 7.0)),
        Ok(draft(2, 7.0)),
        Ok(draft(3, 7.0)),
    ]);
    let evaluator = ScriptedEvaluator::new(vec![
        Ok(verdict(7.0, true, vec![])),
        Ok(verdict(7.0, true, vec![])),
        Ok(verdict(7.0, true, vec![])),
    ]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert_eq!(generator.calls(), 3);
    assert!(result.max_iterations_reached);
    assert!(!result.approved, "7.0 is below the default threshold of 8.0");
    Ok(())
}

#[tokio::test]
async fn score_alone_does_not_accept() -> anyhow::Result<()> {
    // Scores clear the threshold but the evaluator never says ship; the loop
    // runs out and the post-loop policy compares best score to the threshold
    let generator = ScriptedGenerator::new(vec![
        Ok(draft(1, 9.0)),
        Ok(draft(2, 9.0)),
        Ok(draft(3, 9.0)),
    ]);
    let evaluator = ScriptedEvaluator::new(vec![
        Ok(verdict(9.0, false, vec!["tone"])),
        Ok(verdict(9.0, false, vec!["tone"])),
        Ok(verdict(9.0, false, vec!["tone"])),
    ]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert_eq!(generator.calls(), 3);
    assert!(result.max_iterations_reached);
    assert!(result.approved, "best score 9.0 clears the threshold post-loop");
    assert_eq!(result.quality_score, 9.0);
    Ok(())
}

#[tokio::test]
async fn tie_keeps_the_earlier_best() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![
        Ok(draft(1, 7.0)),
        Ok(draft(2, 7.0)),
        Ok(draft(3, 6.0)),
    ]);
    let evaluator = ScriptedEvaluator::new(vec![
        Ok(verdict(7.0, false, vec![])),
        Ok(verdict(7.0, false, vec![])),
        Ok(verdict(6.0, false, vec![])),
    ]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert_eq!(result.quality_score, 7.0);
    assert_eq!(result.candidate.iteration, 1, "tie must not replace the best");
    Ok(())
}

// ============================================================
// Failure policy
// ============================================================

#[tokio::test]
async fn failure_after_best_returns_best_without_raising() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![Ok(draft(1, 6.0)), Ok(draft(2, 6.0))]);
    let evaluator = ScriptedEvaluator::new(vec![
        Ok(verdict(6.0, false, vec!["thin"])),
        Err(transport_failure()),
    ]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert!(result.max_iterations_reached);
    assert!(!result.approved);
    assert_eq!(result.quality_score, 6.0);
    assert_eq!(result.candidate.iteration, 1);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.history.len(), 2);
    assert!(result.history[1].error.is_some());
    // No third iteration is attempted after the fail-soft stop
    assert_eq!(generator.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn single_iteration_failure_is_terminal() {
    let generator = ScriptedGenerator::new(vec![Err(parse_failure())]);
    let evaluator = ScriptedEvaluator::new(vec![]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(
            &spec,
            &input,
            OrchestratorOptions::default().with_max_iterations(1),
        )
        .await;

    assert!(matches!(result, Err(LoopError::Terminal { iterations: 1, .. })));
    assert_eq!(evaluator.calls(), 0);
}

#[tokio::test]
async fn all_iterations_failing_is_terminal() {
    let generator = ScriptedGenerator::new(vec![
        Err(parse_failure()),
        Err(parse_failure()),
        Err(parse_failure()),
    ]);
    let evaluator = ScriptedEvaluator::new(vec![]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await;

    // Without a best candidate the loop keeps trying to the end, then raises
    assert_eq!(generator.calls(), 3);
    assert!(matches!(result, Err(LoopError::Terminal { iterations: 3, .. })));
}

// ============================================================
// Feedback propagation
// ============================================================

#[tokio::test]
async fn feedback_carries_evaluator_issues_forward() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![Ok(draft(1, 6.0)), Ok(draft(2, 8.0))]);
    let evaluator = ScriptedEvaluator::new(vec![
        Ok(verdict(6.0, false, vec!["missing the delivery address"])),
        Ok(verdict(9.0, true, vec![])),
    ]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await?;

    assert_eq!(generator.feedback_at(0), None);
    let second = generator.feedback_at(1).expect("second call gets feedback");
    assert!(second.contains("missing the delivery address"));
    Ok(())
}

// ============================================================
// Quick mode
// ============================================================

#[tokio::test]
async fn quick_mode_skips_the_evaluator() -> anyhow::Result<()> {
    let generator = ScriptedGenerator::new(vec![Ok(draft(1, 7.5))]);
    let evaluator = ScriptedEvaluator::new(vec![]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator.quick(&spec, &input).await?;

    assert!(result.approved);
    assert_eq!(result.quality_score, 7.5);
    assert!(result.sub_scores.is_none());
    assert_eq!(result.iterations, 1);
    assert_eq!(evaluator.calls(), 0);
    assert_eq!(generator.feedback_at(0), None);
    Ok(())
}

#[tokio::test]
async fn quick_mode_generation_failure_is_terminal() {
    let generator = ScriptedGenerator::new(vec![Err(parse_failure())]);
    let evaluator = ScriptedEvaluator::new(vec![]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator.quick(&spec, &input).await;
    assert!(matches!(result, Err(LoopError::Terminal { iterations: 1, .. })));
}

// ============================================================
// Cancellation and options
// ============================================================

#[tokio::test]
async fn cancelled_before_any_candidate_raises() {
    let generator = ScriptedGenerator::new(vec![]);
    let evaluator = ScriptedEvaluator::new(vec![]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    orchestrator.cancel_handle().store(true, Ordering::SeqCst);
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(&spec, &input, OrchestratorOptions::default())
        .await;

    assert!(matches!(result, Err(LoopError::Cancelled)));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn zero_max_iterations_is_rejected() {
    let generator = ScriptedGenerator::new(vec![]);
    let evaluator = ScriptedEvaluator::new(vec![]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(
            &spec,
            &input,
            OrchestratorOptions::default().with_max_iterations(0),
        )
        .await;
    assert!(matches!(result, Err(LoopError::Config(_))));
}

#[tokio::test]
async fn out_of_range_threshold_is_rejected() {
    let generator = ScriptedGenerator::new(vec![]);
    let evaluator = ScriptedEvaluator::new(vec![]);
    let orchestrator = Orchestrator::new(&generator, &evaluator, logger());
    let (spec, input) = spec_and_input();

    let result = orchestrator
        .run(
            &spec,
            &input,
            OrchestratorOptions::default().with_approval_threshold(11.0),
        )
        .await;
    assert!(matches!(result, Err(LoopError::Config(_))));
}
