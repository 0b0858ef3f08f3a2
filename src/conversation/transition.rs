//! Pure state transition function

use super::parse::{parse_reply, ReplyError};
use super::{ConvState, Effect, Event, Turn};
use serde_json::Value;
use thiserror::Error;

/// Error turn text when the agent boundary could not be reached
pub const AGENT_FAILURE_TEXT: &str = "Sorry, I couldn't reach the assistant. Please try again.";

/// Error turn text when the agent answered with something unreadable
pub const MALFORMED_REPLY_TEXT: &str =
    "The assistant returned a response I couldn't read. Please try again.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Agent is busy, wait for the current reply before sending another message")]
    AgentBusy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function. Same inputs, same outputs, no I/O.
pub fn transition(state: ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Input
        // ============================================================
        (ConvState::Idle, Event::UserSubmit { text }) => Ok(start_turn(Turn::user(text))),

        (ConvState::Idle, Event::WidgetAction { tool_name, args }) => {
            Ok(start_turn(Turn::user(describe_widget_action(&tool_name, &args))))
        }

        // One agent call in flight at a time, nothing is queued
        (ConvState::AwaitingAgent, Event::UserSubmit { .. } | Event::WidgetAction { .. }) => {
            Err(TransitionError::AgentBusy)
        }

        // ============================================================
        // Agent boundary outcome
        // ============================================================
        (ConvState::AwaitingAgent, Event::AgentReplied { reply }) => {
            let turn = match parse_reply(reply) {
                Ok(turn) => turn,
                Err(ReplyError::Malformed(_)) => Turn::error(MALFORMED_REPLY_TEXT),
                Err(ReplyError::Boundary(_)) => Turn::error(AGENT_FAILURE_TEXT),
            };
            Ok(finish_turn(turn))
        }

        (ConvState::AwaitingAgent, Event::AgentFailed { error }) => {
            let text = if error.is_malformed() {
                MALFORMED_REPLY_TEXT
            } else {
                AGENT_FAILURE_TEXT
            };
            Ok(finish_turn(Turn::error(text)))
        }

        (ConvState::Idle, event @ (Event::AgentReplied { .. } | Event::AgentFailed { .. })) => {
            Err(TransitionError::InvalidTransition(format!(
                "{} while idle",
                event.name()
            )))
        }
    }
}

/// Text of the user turn synthesized for a widget action
pub fn describe_widget_action(tool_name: &str, args: &Value) -> String {
    format!("User invoked {tool_name} with {args}")
}

fn start_turn(turn: Turn) -> TransitionResult {
    // Append before requesting so the agent sees the new turn
    TransitionResult::new(ConvState::AwaitingAgent)
        .with_effect(Effect::append(turn))
        .with_effect(Effect::notify_state_change(ConvState::AwaitingAgent))
        .with_effect(Effect::RequestAgent)
}

fn finish_turn(turn: Turn) -> TransitionResult {
    TransitionResult::new(ConvState::Idle)
        .with_effect(Effect::append(turn))
        .with_effect(Effect::notify_state_change(ConvState::Idle))
        .with_effect(Effect::NotifyAgentDone)
}
