//! Transcript entries

use crate::tools::WidgetData;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    Error,
}

/// A tool invocation reported by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Web source the agent grounded its answer on. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnContent {
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

/// One entry of the conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
    /// Set when the agent's reply decoded as a widget payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<GroundingSource>,
}

impl Turn {
    fn with_role(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: TurnContent {
                text: text.into(),
                tool_calls: Vec::new(),
            },
            widget: None,
            sources: Vec::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::with_role(Role::Agent, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::with_role(Role::Error, text)
    }

    pub fn text(&self) -> &str {
        &self.content.text
    }

    #[cfg(test)]
    pub fn is_widget(&self) -> bool {
        self.widget.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let mut turn = Turn::agent("hello");
        turn.content.tool_calls.push(ToolCallRecord {
            name: "getOffers".to_string(),
            args: json!({ "category": "home" }),
        });
        let wire = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            wire,
            json!({
                "role": "agent",
                "content": {
                    "text": "hello",
                    "toolCalls": [{ "name": "getOffers", "args": { "category": "home" } }]
                }
            })
        );
    }

    #[test]
    fn test_decodes_minimal_turn() {
        let turn: Turn =
            serde_json::from_value(json!({ "role": "user", "content": { "text": "hi" } })).unwrap();
        assert_eq!(turn, Turn::user("hi"));
        assert!(!turn.is_widget());
    }
}
