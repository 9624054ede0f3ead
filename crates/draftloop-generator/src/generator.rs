use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use draftloop_completion::{
    extract_payload, CompletionClient, CompletionConfig, CompletionError, CompletionRequest,
    ExtractError, Turn,
};

use crate::{Candidate, CollectedInput, GeneratorPrompts, TaskSpec};

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Completion call failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Failed to locate candidate payload: {0}")]
    Parse(#[from] ExtractError),
}

/// Seam between the orchestrator and candidate production
#[async_trait]
pub trait Generate: Send + Sync {
    /// Produce one candidate for the given iteration. `feedback` carries the
    /// formatted evaluator feedback from the previous iteration, if any.
    async fn generate(
        &self,
        spec: &TaskSpec,
        input: &CollectedInput,
        feedback: Option<&str>,
        iteration: usize,
    ) -> Result<Candidate, GenerationError>;
}

/// Generator that produces candidates through the completion service
pub struct Generator<'a> {
    client: &'a dyn CompletionClient,
    config: CompletionConfig,
}

impl<'a> Generator<'a> {
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
impl Generate for Generator<'_> {
    async fn generate(
        &self,
        spec: &TaskSpec,
        input: &CollectedInput,
        feedback: Option<&str>,
        iteration: usize,
    ) -> Result<Candidate, GenerationError> {
        let instructions = match feedback {
            Some(feedback) => GeneratorPrompts::build_refinement_prompt(spec, input, feedback),
            None => GeneratorPrompts::build_generation_prompt(spec, input),
        };

        debug!(
            iteration,
            refining = feedback.is_some(),
            client = self.client.name(),
            "Running generator"
        );

        let request = CompletionRequest::new(instructions, spec.output_shape.clone())
            .with_turn(Turn::user("Produce the draft now."));
        let response = self
            .client
            .complete_with_timeout(&request, &self.config)
            .await?;

        let payload = extract_payload(&response)?;
        Ok(candidate_from_payload(payload, iteration))
    }
}

/// Build a candidate from a located payload.
///
/// Only the absence of the payload itself is fatal (and that is handled
/// before this point); any individually malformed field degrades to an
/// empty default so one bad blob never sinks an otherwise usable draft.
fn candidate_from_payload(payload: Value, iteration: usize) -> Candidate {
    let fields = match payload {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    Candidate {
        title: string_field(&fields, "title", "Untitled draft"),
        summary: string_field(&fields, "summary", ""),
        structured_data: structured_field(&fields, "structured_data"),
        rendered_output: string_field(&fields, "rendered_output", ""),
        confidence: fields
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(5.0)
            .clamp(1.0, 10.0),
        notes: string_field(&fields, "notes", ""),
        iteration,
    }
}

fn string_field(fields: &Map<String, Value>, key: &str, default: &str) -> String {
    match fields.get(key) {
        Some(Value::String(text)) => text.clone(),
        _ => default.to_string(),
    }
}

/// Read a field that should be a nested structure. A serialized string is
/// parsed; a parse failure or wrong type degrades to an empty object.
fn structured_field(fields: &Map<String, Value>, key: &str) -> Value {
    match fields.get(key) {
        Some(value @ (Value::Object(_) | Value::Array(_))) => value.clone(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => {
                warn!(key, "Malformed serialized field, degrading to empty object");
                Value::Object(Map::new())
            }
        },
        Some(_) => {
            warn!(key, "Unexpected field type, degrading to empty object");
            Value::Object(Map::new())
        }
        None => Value::Object(Map::new()),
    }
}
