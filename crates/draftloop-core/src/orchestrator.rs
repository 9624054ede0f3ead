use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use draftloop_evaluator::{format_feedback, Evaluate};
use draftloop_generator::{CollectedInput, Generate, TaskSpec};
use draftloop_logging::{LogEvent, Logger};

use crate::context::{IterationRecord, LoopPhase, RunContext};
use crate::error::{IterationError, LoopError};
use crate::outcome::OrchestrationResult;

/// Options for one orchestration run
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    /// Maximum generate-evaluate cycles (must be >= 1)
    pub max_iterations: usize,
    /// Minimum score that, together with evaluator approval, accepts a
    /// candidate (0-10)
    pub approval_threshold: f64,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            approval_threshold: 8.0,
        }
    }
}

impl OrchestratorOptions {
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_approval_threshold(mut self, threshold: f64) -> Self {
        self.approval_threshold = threshold;
        self
    }

    fn validate(&self) -> Result<(), LoopError> {
        if self.max_iterations < 1 {
            return Err(LoopError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=10.0).contains(&self.approval_threshold) {
            return Err(LoopError::Config(format!(
                "approval_threshold must be in 0..=10, got {}",
                self.approval_threshold
            )));
        }
        Ok(())
    }
}

/// Orchestrates the bounded generate-evaluate-refine loop
pub struct Orchestrator<'a> {
    generator: &'a dyn Generate,
    evaluator: &'a dyn Evaluate,
    logger: Arc<Logger>,
    cancelled: Arc<AtomicBool>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(generator: &'a dyn Generate, evaluator: &'a dyn Evaluate, logger: Arc<Logger>) -> Self {
        Self {
            generator,
            evaluator,
            logger,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to cancel the run. Cancellation takes effect at the next
    /// iteration boundary; an in-flight completion call is not aborted.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Drive the loop to an approved candidate, a best-effort fallback, or a
    /// terminal failure.
    pub async fn run(
        &self,
        spec: &TaskSpec,
        input: &CollectedInput,
        options: OrchestratorOptions,
    ) -> Result<OrchestrationResult, LoopError> {
        options.validate()?;

        let run_id = Uuid::new_v4().to_string();
        let mut context = RunContext::new(options.max_iterations, options.approval_threshold);
        self.logger.log(&LogEvent::RunStarted {
            run_id,
            purpose: spec.purpose.clone(),
            max_iterations: options.max_iterations,
            approval_threshold: options.approval_threshold,
        });

        let mut iterations_done = options.max_iterations;
        let mut last_error = String::from("no iterations were attempted");

        for iteration in 1..=options.max_iterations {
            if self.cancelled.load(Ordering::SeqCst) {
                info!(iteration, "Run cancelled");
                self.logger.log(&LogEvent::RunCancelled { iteration });
                if context.has_best() {
                    iterations_done = iteration - 1;
                    break;
                }
                return Err(LoopError::Cancelled);
            }

            context.iteration = iteration;
            match self.run_iteration(spec, input, &mut context).await {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => {} // continue refining
                Err(error) => {
                    let message = error.to_string();
                    warn!(iteration, error = %message, "Error during iteration");
                    context.push_record(IterationRecord::failure(iteration, &message));
                    self.logger.log(&LogEvent::IterationFailed {
                        iteration,
                        error: message.clone(),
                    });
                    last_error = message;

                    // Fail-soft: a usable candidate from an earlier iteration
                    // beats retrying into an error we may hit again
                    if context.has_best() {
                        iterations_done = iteration;
                        break;
                    }
                }
            }
        }

        context.set_phase(if context.has_best() {
            LoopPhase::MaxIterationsReached
        } else {
            LoopPhase::Failed
        });

        let best_score = context.best_score();
        match context.into_best() {
            Some((candidate, evaluation, history, duration)) => {
                self.logger.log(&LogEvent::MaxIterationsReached {
                    iterations: iterations_done,
                    best_score,
                });
                Ok(OrchestrationResult::best_effort(
                    candidate,
                    &evaluation,
                    options.approval_threshold,
                    iterations_done,
                    history,
                    duration,
                ))
            }
            None => {
                self.logger.log(&LogEvent::RunFailed {
                    iterations: options.max_iterations,
                    error: last_error.clone(),
                });
                Err(LoopError::Terminal {
                    iterations: options.max_iterations,
                    last_error,
                })
            }
        }
    }

    /// Single-pass mode: one generator call, no evaluation, no refinement.
    /// The candidate's own confidence stands in for the quality score.
    pub async fn quick(
        &self,
        spec: &TaskSpec,
        input: &CollectedInput,
    ) -> Result<OrchestrationResult, LoopError> {
        let started = Instant::now();
        self.logger.log(&LogEvent::QuickRunStarted {
            purpose: spec.purpose.clone(),
        });

        let candidate = self
            .generator
            .generate(spec, input, None, 1)
            .await
            .map_err(|error| {
                let message = error.to_string();
                self.logger.log(&LogEvent::RunFailed {
                    iterations: 1,
                    error: message.clone(),
                });
                LoopError::Terminal {
                    iterations: 1,
                    last_error: message,
                }
            })?;

        let history = vec![IterationRecord {
            iteration: 1,
            candidate_summary: Some(candidate.short_description()),
            evaluation_summary: None,
            error: None,
            timestamp: Utc::now(),
        }];
        Ok(OrchestrationResult::quick(candidate, history, started.elapsed()))
    }

    /// Run a single generate-evaluate cycle.
    /// Returns Some(result) if the loop should terminate, None to continue.
    async fn run_iteration(
        &self,
        spec: &TaskSpec,
        input: &CollectedInput,
        context: &mut RunContext,
    ) -> Result<Option<OrchestrationResult>, IterationError> {
        let iteration = context.iteration;

        context.set_phase(LoopPhase::Generating);
        self.logger.log(&LogEvent::GeneratorStarted {
            iteration,
            refining: context.last_feedback.is_some(),
        });
        debug!(iteration, "Running generator");
        let candidate = self
            .generator
            .generate(spec, input, context.last_feedback.as_deref(), iteration)
            .await?;
        self.logger.log(&LogEvent::GeneratorCompleted {
            iteration,
            title: candidate.title.clone(),
            confidence: candidate.confidence,
        });

        context.set_phase(LoopPhase::Evaluating);
        debug!(iteration, "Running evaluator");
        let evaluation = self
            .evaluator
            .evaluate(spec, input, &candidate, iteration)
            .await?;
        self.logger.log(&LogEvent::EvaluatorCompleted {
            iteration,
            decision: evaluation.short_description(),
            score: evaluation.score,
        });

        context.push_record(IterationRecord::success(iteration, &candidate, &evaluation));

        // Acceptance needs both halves: the evaluator's ship/no-ship call
        // and the numeric threshold
        let accepted = evaluation.approved && evaluation.score >= context.approval_threshold;
        context.observe(candidate.clone(), evaluation.clone());

        if accepted {
            context.set_phase(LoopPhase::Approved);
            self.logger.log(&LogEvent::RunApproved {
                iterations: iteration,
                score: evaluation.score,
            });
            // The current candidate ships, not the historical best
            return Ok(Some(OrchestrationResult::approved(
                candidate,
                &evaluation,
                iteration,
                context.history.clone(),
                context.total_duration(),
            )));
        }

        if iteration < context.max_iterations {
            context.set_phase(LoopPhase::Refining);
            info!(
                iteration,
                issues = evaluation.issues.len(),
                "Candidate not approved; refining"
            );
            context.set_feedback(format_feedback(&evaluation));
        }

        Ok(None)
    }
}
