use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::{CompletionRequest, CompletionResponse};

/// Errors that can occur while calling the completion service
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Completion call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Completion service rejected the request: {0}")]
    Rejected(String),

    #[error("Completion configuration error: {0}")]
    Config(String),
}

/// Configuration for completion calls
#[derive(Debug, Clone, Default)]
pub struct CompletionConfig {
    /// Model to use (if the service supports selection)
    pub model: Option<String>,
    /// Optional per-call timeout (None = no limit)
    pub timeout: Option<Duration>,
}

impl CompletionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The core abstraction over the external completion service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Human-readable name of the backing service (e.g. "anthropic", "stub")
    fn name(&self) -> &str;

    /// Send a completion request and wait for the full response envelope
    async fn complete(
        &self,
        request: &CompletionRequest,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, CompletionError>;

    /// Send a completion request, honoring the configured per-call timeout.
    /// With no timeout configured this is equivalent to [`complete`](Self::complete).
    async fn complete_with_timeout(
        &self,
        request: &CompletionRequest,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, CompletionError> {
        match config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.complete(request, config))
                .await
                .map_err(|_| CompletionError::Timeout(limit))?,
            None => self.complete(request, config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowClient {
        delay: Duration,
    }

    #[async_trait]
    impl CompletionClient for SlowClient {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, CompletionError> {
            tokio::time::sleep(self.delay).await;
            Ok(CompletionResponse::default())
        }
    }

    #[tokio::test]
    async fn test_timeout_enforced() {
        let client = SlowClient {
            delay: Duration::from_millis(200),
        };
        let config = CompletionConfig::new().with_timeout(Duration::from_millis(10));
        let request = CompletionRequest::new("test", serde_json::json!({}));

        let result = client.complete_with_timeout(&request, &config).await;
        assert!(matches!(result, Err(CompletionError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_no_timeout_completes() {
        let client = SlowClient {
            delay: Duration::from_millis(1),
        };
        let config = CompletionConfig::new();
        let request = CompletionRequest::new("test", serde_json::json!({}));

        let result = client.complete_with_timeout(&request, &config).await;
        assert!(result.is_ok());
    }
}
