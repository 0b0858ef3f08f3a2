//! Agent boundary
//!
//! The agent boundary is a single request/response operation: transcript in,
//! candidates (text, function calls, grounding) out. It is implemented
//! in-process by `AgentRunner` on top of a `ModelClient`, or remotely by
//! `HttpAgentBoundary`.

mod config;
mod error;
mod gemini;
mod http;
mod runner;
mod types;

pub use config::AgentConfig;
pub use error::AgentError;
#[cfg(test)]
pub use error::AgentErrorKind;
pub use gemini::GeminiService;
pub use http::HttpAgentBoundary;
pub use runner::AgentRunner;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// The request/response boundary the orchestrator talks to
#[async_trait]
pub trait AgentBoundary: Send + Sync {
    async fn call(&self, request: &AgentRequest) -> Result<AgentReply, AgentError>;
}

#[async_trait]
impl<T: AgentBoundary + ?Sized> AgentBoundary for Arc<T> {
    async fn call(&self, request: &AgentRequest) -> Result<AgentReply, AgentError> {
        (**self).call(request).await
    }
}

/// Common interface for model providers
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, AgentError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Build the model client described by `config`
pub fn model_from_config(config: &AgentConfig) -> Result<Arc<dyn ModelClient>, AgentError> {
    if !config.has_credentials() {
        return Ok(Arc::new(UnconfiguredModel));
    }
    let service = GeminiService::new(
        config.api_key.clone(),
        &config.model,
        config.gateway.as_deref(),
    )?;
    Ok(Arc::new(LoggingService::new(Arc::new(service))))
}

/// Stand-in used when no credentials are configured
pub struct UnconfiguredModel;

#[async_trait]
impl ModelClient for UnconfiguredModel {
    async fn complete(&self, _request: &ModelRequest) -> Result<ModelResponse, AgentError> {
        Err(AgentError::auth(
            "No model configured. Set GEMINI_API_KEY or LLM_GATEWAY.",
        ))
    }

    fn model_id(&self) -> &'static str {
        "unconfigured"
    }
}

/// Logging wrapper for model clients
pub struct LoggingService {
    inner: Arc<dyn ModelClient>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn ModelClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl ModelClient for LoggingService {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, AgentError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    tool_calls = response.tool_uses().len(),
                    "Model request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Model request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
