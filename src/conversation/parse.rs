//! Turning an agent reply into a transcript turn
//!
//! Reply text may be plain prose or a serialized widget payload that a
//! widget tool produced. The text is decoded eagerly into [`ReplyBody`]
//! so the two never get confused downstream.

use super::{GroundingSource, ToolCallRecord, Turn};
use crate::agent::{AgentReply, Part};
use crate::tools::{Status, WidgetData, WidgetPayload};
use std::collections::HashSet;
use thiserror::Error;

/// Displayed in place of the raw payload when a reply carries a widget
pub const WIDGET_CONFIRMATION_TEXT: &str = "Here are the offers I found for you.";

const WIDGET_ERROR_FALLBACK: &str = "The offers could not be displayed.";

/// What a reply's text turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Widget(WidgetData),
    /// A widget payload with `status: "error"`, shown as its message
    WidgetError(String),
    Prose(String),
}

impl ReplyBody {
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            return ReplyBody::Prose(text.to_string());
        }

        match serde_json::from_str::<WidgetPayload>(trimmed) {
            Ok(WidgetPayload {
                status: Status::Success,
                widget_data: Some(data),
                ..
            }) => ReplyBody::Widget(data),
            Ok(WidgetPayload {
                status: Status::Error,
                message,
                ..
            }) => ReplyBody::WidgetError(
                message.unwrap_or_else(|| WIDGET_ERROR_FALLBACK.to_string()),
            ),
            // Valid JSON without a widget is just text the agent wrote
            _ => ReplyBody::Prose(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("agent boundary reported an error: {0}")]
    Boundary(String),
    #[error("malformed agent reply: {0}")]
    Malformed(String),
}

/// Build the agent turn for a reply. Only the first candidate is used.
pub fn parse_reply(reply: AgentReply) -> Result<Turn, ReplyError> {
    let candidates = match reply {
        AgentReply::Error { error } => return Err(ReplyError::Boundary(error)),
        AgentReply::Candidates { candidates } => candidates,
    };

    let Some(candidate) = candidates.into_iter().next() else {
        return Err(ReplyError::Malformed("no candidates".to_string()));
    };
    let parts = candidate.content.parts;
    if parts.is_empty() {
        return Err(ReplyError::Malformed("candidate has no parts".to_string()));
    }

    let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
    let tool_calls = collect_tool_calls(&parts);
    let sources = collect_sources(&parts);

    if text.is_empty() && tool_calls.is_empty() {
        return Err(ReplyError::Malformed(
            "candidate has neither text nor function calls".to_string(),
        ));
    }

    let mut turn = match ReplyBody::classify(&text) {
        ReplyBody::Widget(data) => {
            let mut turn = Turn::agent(WIDGET_CONFIRMATION_TEXT);
            turn.widget = Some(data);
            turn
        }
        ReplyBody::WidgetError(message) => Turn::agent(message),
        ReplyBody::Prose(text) => Turn::agent(text),
    };
    turn.content.tool_calls = tool_calls;
    turn.sources = sources;
    Ok(turn)
}

fn collect_tool_calls(parts: &[Part]) -> Vec<ToolCallRecord> {
    parts
        .iter()
        .filter_map(|p| p.function_call.as_ref())
        .map(|call| ToolCallRecord {
            name: call.name.clone(),
            args: call.args.clone(),
        })
        .collect()
}

/// Web grounding chunks, first occurrence of each uri wins
fn collect_sources(parts: &[Part]) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();
    parts
        .iter()
        .filter_map(|p| p.grounding_metadata.as_ref())
        .flat_map(|m| m.grounding_chunks.iter())
        .filter_map(|chunk| chunk.web.as_ref())
        .filter(|web| seen.insert(web.uri.clone()))
        .map(|web| GroundingSource {
            uri: web.uri.clone(),
            title: web.title.clone(),
        })
        .collect()
}
