//! Events that can occur in a conversation

use crate::agent::{AgentError, AgentReply};
use serde_json::Value;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
    },
    /// An action embedded in a rendered widget was triggered
    WidgetAction {
        tool_name: String,
        args: Value,
    },

    // Agent boundary events
    AgentReplied {
        reply: AgentReply,
    },
    AgentFailed {
        error: AgentError,
    },
}

impl Event {
    pub fn user_submit(text: impl Into<String>) -> Self {
        Event::UserSubmit { text: text.into() }
    }

    pub fn widget_action(tool_name: impl Into<String>, args: Value) -> Self {
        Event::WidgetAction {
            tool_name: tool_name.into(),
            args,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::UserSubmit { .. } => "user_submit",
            Event::WidgetAction { .. } => "widget_action",
            Event::AgentReplied { .. } => "agent_replied",
            Event::AgentFailed { .. } => "agent_failed",
        }
    }
}
