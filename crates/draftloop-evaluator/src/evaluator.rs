use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use draftloop_completion::{
    extract_payload, CompletionClient, CompletionConfig, CompletionError, CompletionRequest,
    ExtractError, Turn,
};
use draftloop_generator::{Candidate, CollectedInput, TaskSpec};

use crate::{EvaluationResult, EvaluatorPrompts};

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Completion call failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Failed to locate evaluation payload: {0}")]
    Parse(#[from] ExtractError),

    #[error("Evaluation payload malformed: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Seam between the orchestrator and candidate scoring
#[async_trait]
pub trait Evaluate: Send + Sync {
    async fn evaluate(
        &self,
        spec: &TaskSpec,
        input: &CollectedInput,
        candidate: &Candidate,
        iteration: usize,
    ) -> Result<EvaluationResult, EvaluationError>;
}

/// Evaluator that scores candidates through the completion service
pub struct Evaluator<'a> {
    client: &'a dyn CompletionClient,
    config: CompletionConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(client: &'a dyn CompletionClient) -> Self {
        Self {
            client,
            config: CompletionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl Evaluate for Evaluator<'_> {
    async fn evaluate(
        &self,
        spec: &TaskSpec,
        input: &CollectedInput,
        candidate: &Candidate,
        iteration: usize,
    ) -> Result<EvaluationResult, EvaluationError> {
        let instructions = EvaluatorPrompts::build_evaluation_prompt(spec, input, candidate, iteration);

        debug!(
            iteration,
            prompt_len = instructions.len(),
            client = self.client.name(),
            "Running evaluator"
        );

        let request = CompletionRequest::new(instructions, serde_json::json!({}))
            .with_turn(Turn::user("Review the draft now."));
        let response = self
            .client
            .complete_with_timeout(&request, &self.config)
            .await?;

        let payload = extract_payload(&response)?;
        let result = EvaluationResult::from_payload(payload)?;

        info!(
            iteration,
            decision = %result.short_description(),
            "Evaluator completed"
        );

        Ok(result)
    }
}
