//! HTTP API for the storefront agent

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::agent::AgentBoundary;
use crate::runtime::RuntimeManager;
use crate::tools::ToolDispatcher;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: ToolDispatcher,
    pub agent: Arc<dyn AgentBoundary>,
    pub runtime: Arc<RuntimeManager>,
}

impl AppState {
    pub fn new(
        dispatcher: ToolDispatcher,
        agent: Arc<dyn AgentBoundary>,
        agent_timeout: Option<Duration>,
    ) -> Self {
        Self {
            runtime: Arc::new(RuntimeManager::new(agent.clone(), agent_timeout)),
            dispatcher,
            agent,
        }
    }
}
