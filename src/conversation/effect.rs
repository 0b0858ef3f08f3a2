//! Effects produced by state transitions

use super::{ConvState, Turn};

/// Effects to be executed after a state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a turn to the transcript and publish it
    AppendTurn { turn: Turn },

    /// Call the agent boundary with the current transcript
    RequestAgent,

    /// Publish the new state
    NotifyStateChange { state: ConvState },

    /// Publish that the agent finished its turn
    NotifyAgentDone,
}

impl Effect {
    pub fn append(turn: Turn) -> Self {
        Effect::AppendTurn { turn }
    }

    pub fn notify_state_change(state: ConvState) -> Self {
        Effect::NotifyStateChange { state }
    }
}
