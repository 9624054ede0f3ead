use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single conversation turn sent to the completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request sent to the completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Instruction set for this call
    pub instructions: String,
    /// Desired shape of the structured output, passed through opaquely
    pub output_shape: Value,
    /// Conversation turns accompanying the instructions
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl CompletionRequest {
    pub fn new(instructions: impl Into<String>, output_shape: Value) -> Self {
        Self {
            instructions: instructions.into(),
            output_shape,
            turns: Vec::new(),
        }
    }

    pub fn with_turn(mut self, turn: Turn) -> Self {
        self.turns.push(turn);
        self
    }
}

/// One entry of the service's generated-items list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedItem {
    /// Item kind as reported by the service (e.g. "message", "tool_result")
    #[serde(default)]
    pub kind: String,
    /// Text content, when the item carries any
    pub content: Option<String>,
}

/// One raw model message from the response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: String,
    pub text: String,
}

/// Response envelope returned by the completion service.
///
/// Different service backends populate different fields; callers locate the
/// structured payload via [`extract_payload`](crate::extract_payload) rather
/// than reading any one field directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The service's final structured output, if it reported one
    pub final_output: Option<Value>,
    /// The current execution step, sometimes a serialized payload
    pub current_step: Option<Value>,
    /// Generated items accumulated during the call
    #[serde(default)]
    pub items: Vec<GeneratedItem>,
    /// Raw model messages, in order
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

impl CompletionResponse {
    /// Check whether any field could plausibly hold a payload
    pub fn has_content(&self) -> bool {
        self.final_output.is_some()
            || self.current_step.is_some()
            || !self.items.is_empty()
            || !self.messages.is_empty()
    }

    /// Count of generated items in the envelope
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
