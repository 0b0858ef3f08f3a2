//! Gemini `generateContent` model client

use super::types::{
    ContentBlock, GroundingMetadata, MessageRole, ModelRequest, ModelResponse,
};
use super::{AgentError, ModelClient};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    /// Appended as `?key=`; `None` in gateway mode
    api_key: Option<String>,
    base_url: String,
    model_id: String,
}

impl GeminiService {
    /// With a gateway the key is never sent, even if one is configured.
    pub fn new(
        api_key: Option<String>,
        model: &str,
        gateway: Option<&str>,
    ) -> Result<Self, AgentError> {
        let base_url = match gateway {
            Some(gw) => format!(
                "{}/gemini/v1beta/models/{model}:generateContent",
                gw.trim_end_matches('/')
            ),
            None => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
            ),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AgentError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|_| gateway.is_none()),
            base_url,
            model_id: model.to_string(),
        })
    }

    fn request_url(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}?key={key}", self.base_url),
            None => self.base_url.clone(),
        }
    }

    fn translate_request(request: &ModelRequest) -> GeminiRequest {
        let system_instruction = if request.system.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: request.system.clone(),
                }],
            })
        };

        let contents = request
            .messages
            .iter()
            .filter_map(|msg| {
                let role = match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Model => "model",
                };
                let parts: Vec<GeminiPart> = msg
                    .content
                    .iter()
                    .map(|block| match block {
                        ContentBlock::Text { text } => GeminiPart::Text { text: text.clone() },
                        ContentBlock::ToolUse { name, input } => GeminiPart::FunctionCall {
                            function_call: GeminiFunctionCall {
                                name: name.clone(),
                                args: input.clone(),
                            },
                        },
                        ContentBlock::ToolResult {
                            name,
                            content,
                            is_error,
                        } => GeminiPart::FunctionResponse {
                            function_response: GeminiFunctionResponse {
                                name: name.clone(),
                                response: serde_json::json!({
                                    "result": content,
                                    "error": is_error
                                }),
                            },
                        },
                    })
                    .collect();

                (!parts.is_empty()).then(|| GeminiContent {
                    role: Some(role.to_string()),
                    parts,
                })
            })
            .collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: request.max_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: max,
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<ModelResponse, AgentError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::malformed("No candidates in response"))?;

        let content = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| match part {
                GeminiPart::Text { text } if !text.is_empty() => Some(ContentBlock::Text { text }),
                GeminiPart::FunctionCall { function_call } => Some(ContentBlock::ToolUse {
                    name: function_call.name,
                    input: function_call.args,
                }),
                _ => None,
            })
            .collect();

        Ok(ModelResponse {
            content,
            grounding: candidate.grounding_metadata.filter(|g| !g.is_empty()),
        })
    }
}

#[async_trait]
impl ModelClient for GeminiService {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, AgentError> {
        let gemini_request = Self::translate_request(request);

        let url = self.request_url();

        let response = self
            .client
            .post(&url)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    AgentError::network(format!("Connection failed: {e}"))
                } else {
                    AgentError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |r| r.error.message);
            return Err(match status.as_u16() {
                400 => AgentError::invalid_request(format!("Invalid request: {message}")),
                401 | 403 => AgentError::auth(format!("Authentication failed: {message}")),
                429 => AgentError::rate_limit(format!("Rate limit exceeded: {message}")),
                500..=599 => AgentError::server_error(format!("Server error: {message}")),
                _ => AgentError::unknown(format!("HTTP {status}: {message}")),
            });
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::malformed(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    /// Part kinds this client doesn't use (inline data, thoughts, ...)
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
