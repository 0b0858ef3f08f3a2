//! Conversation state

use serde::{Deserialize, Serialize};

/// Orchestrator state. At most one agent call is in flight per conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input
    #[default]
    Idle,

    /// Agent call in flight; submissions are rejected
    AwaitingAgent,
}

impl ConvState {
    pub fn is_working(self) -> bool {
        self == ConvState::AwaitingAgent
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::AwaitingAgent => "awaiting_agent",
        }
    }
}
