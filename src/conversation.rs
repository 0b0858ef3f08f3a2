//! Conversation state machine and transcript
//!
//! Elm-style: [`transition`] is pure and returns effects that the runtime
//! executes. The transcript lives in a [`ConversationStore`].

mod effect;
pub mod event;
mod parse;
pub mod state;
mod store;
pub(crate) mod transition;
mod turn;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::ConvState;
pub use store::ConversationStore;
pub use transition::{transition, TransitionError};
pub use turn::{GroundingSource, Role, ToolCallRecord, Turn};

#[cfg(test)]
pub use parse::{parse_reply, ReplyBody, WIDGET_CONFIRMATION_TEXT};
#[cfg(test)]
pub use transition::AGENT_FAILURE_TEXT;
