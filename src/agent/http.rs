//! Remote agent boundary over HTTP

use super::{AgentBoundary, AgentError, AgentReply, AgentRequest};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Posts requests to a remote `/api/agent` endpoint
pub struct HttpAgentBoundary {
    client: Client,
    endpoint: String,
}

impl HttpAgentBoundary {
    pub fn new(base_url: &str) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AgentError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/agent", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AgentBoundary for HttpAgentBoundary {
    async fn call(&self, request: &AgentRequest) -> Result<AgentReply, AgentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::timeout(format!("Agent request timed out: {e}"))
                } else {
                    AgentError::network(format!("Agent request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::network(format!("Failed to read agent response: {e}")))?;

        // `{error}` bodies come with non-2xx statuses and are still replies
        match serde_json::from_str::<AgentReply>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(AgentError::server_error(format!(
                "Agent endpoint returned {status}: {body}"
            ))),
            Err(e) => Err(AgentError::malformed(format!(
                "Could not decode agent response: {e}"
            ))),
        }
    }
}
