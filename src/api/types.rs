//! API request and response types

use crate::agent::ToolDefinition;
use crate::conversation::{ConvState, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Request to trigger a widget action
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
}

/// Response with the registered tools
#[derive(Debug, Serialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Response for conversation creation
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Response with a conversation's transcript
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: String,
    pub state: ConvState,
    pub turns: Vec<Turn>,
}

/// Response for chat and action submissions
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
