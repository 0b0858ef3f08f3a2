//! Mock implementations for testing
//!
//! These mocks enable runtime and agent tests without real I/O.

use crate::agent::{
    AgentBoundary, AgentError, AgentReply, AgentRequest, ModelClient, ModelRequest, ModelResponse,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Semaphore;

// ============================================================================
// Mock Agent Boundary
// ============================================================================

/// Agent boundary that returns queued replies
pub struct MockAgentBoundary {
    replies: Mutex<VecDeque<Result<AgentReply, AgentError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<AgentRequest>>,
}

impl MockAgentBoundary {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, reply: AgentReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_error(&self, error: AgentError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockAgentBoundary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentBoundary for MockAgentBoundary {
    async fn call(&self, request: &AgentRequest) -> Result<AgentReply, AgentError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::network("No mock reply queued")))
    }
}

// ============================================================================
// Gated Agent Boundary (for busy and timeout testing)
// ============================================================================

/// Agent boundary that holds each call until the test releases it
pub struct GatedAgentBoundary {
    inner: MockAgentBoundary,
    gate: Semaphore,
}

impl GatedAgentBoundary {
    pub fn new() -> Self {
        Self {
            inner: MockAgentBoundary::new(),
            gate: Semaphore::new(0),
        }
    }

    pub fn queue_reply(&self, reply: AgentReply) {
        self.inner.queue_reply(reply);
    }

    /// Let one pending or future call proceed
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn recorded_requests(&self) -> Vec<AgentRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl AgentBoundary for GatedAgentBoundary {
    async fn call(&self, request: &AgentRequest) -> Result<AgentReply, AgentError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| AgentError::network("gate closed"))?;
        permit.forget();
        self.inner.call(request).await
    }
}

// ============================================================================
// Scripted Model
// ============================================================================

/// Model client that returns queued responses
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelResponse, AgentError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_response(&self, response: ModelResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: AgentError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, AgentError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::network("No scripted response queued")))
    }

    fn model_id(&self) -> &'static str {
        "scripted"
    }
}
