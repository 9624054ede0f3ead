mod client;
mod extract;
mod response;

pub use client::{CompletionClient, CompletionConfig, CompletionError};
pub use extract::{extract_payload, parse_object, ExtractError};
pub use response::{CompletionRequest, CompletionResponse, GeneratedItem, RawMessage, Turn};
