use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::CompletionResponse;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No structured payload found in completion response")]
    NoPayload,
}

type Strategy = fn(&CompletionResponse) -> Option<Value>;

/// Ordered extraction strategies. The first one that yields a parseable
/// payload wins; later entries are never consulted.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("final_output", from_final_output),
    ("current_step", from_current_step),
    ("items", from_items),
    ("messages", from_messages),
];

/// Locate the structured payload inside a completion response.
///
/// Tries, in order: the final structured output field; the current execution
/// step (parsed when it arrives as serialized text); the generated-items list
/// scanned from the end; the raw message list scanned from the front.
/// Exhausting all strategies yields [`ExtractError::NoPayload`].
pub fn extract_payload(response: &CompletionResponse) -> Result<Value, ExtractError> {
    for (name, strategy) in STRATEGIES {
        if let Some(payload) = strategy(response) {
            debug!(strategy = name, "Located structured payload");
            return Ok(payload);
        }
    }
    Err(ExtractError::NoPayload)
}

fn from_final_output(response: &CompletionResponse) -> Option<Value> {
    value_as_object(response.final_output.as_ref()?)
}

fn from_current_step(response: &CompletionResponse) -> Option<Value> {
    value_as_object(response.current_step.as_ref()?)
}

fn from_items(response: &CompletionResponse) -> Option<Value> {
    // Later items are more likely to carry the finished payload
    response
        .items
        .iter()
        .rev()
        .find_map(|item| item.content.as_deref().and_then(parse_object))
}

fn from_messages(response: &CompletionResponse) -> Option<Value> {
    response
        .messages
        .iter()
        .find_map(|message| parse_object(&message.text))
}

fn value_as_object(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) => Some(value.clone()),
        Value::String(text) => parse_object(text),
        _ => None,
    }
}

/// Parse text as a JSON object, tolerating surrounding markdown code fences.
/// Anything that is not a JSON object (bare strings, arrays, numbers) is
/// rejected so that prose never masquerades as a payload.
pub fn parse_object(text: &str) -> Option<Value> {
    let candidate = strip_code_fence(text.trim());
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => text,
    }
}
