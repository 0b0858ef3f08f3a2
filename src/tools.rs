//! Tools exposed to the agent
//!
//! Tools are stateless singletons registered once at startup. All per-call
//! data arrives through the JSON input, so concurrent dispatches of the same
//! tool never interfere.

mod dispatch;
mod offers;
mod purchase_link;
pub mod schema;
pub mod widget;

pub use dispatch::ToolDispatcher;
pub use offers::GetOffersTool;
pub use purchase_link::CreatePurchaseLinkTool;
pub use widget::{GenerateOfferWidgetTool, WidgetData, WidgetPayload};

use crate::agent::ToolDefinition;
use crate::catalog::Catalog;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Outcome marker shared by every structured payload smuggled through a
/// text content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// One item of a content envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
}

/// Standard wrapper returned by every tool, success or failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEnvelope {
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ContentEnvelope {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Serialize `payload` into a single text item
    pub fn json(payload: &impl Serialize) -> Self {
        Self::text(serde_json::to_string(payload).unwrap_or_default())
    }

    /// Error-flavored envelope carrying a serialized `ToolErrorPayload`
    pub fn error(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        let payload = ToolErrorPayload {
            status: Status::Error,
            kind,
            message: message.into(),
        };
        Self {
            is_error: true,
            ..Self::json(&payload)
        }
    }

    /// Text of every item, concatenated in order
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                Content::Text { text } => text.as_str(),
            })
            .collect()
    }
}

/// Which failure produced an error content item.
///
/// Soft domain errors and dispatcher failures share one payload shape; the
/// kind is the only discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    ValidationError,
    ToolExecutionError,
    MissingOfferId,
}

/// Body of an error content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolErrorPayload {
    pub status: Status,
    pub kind: ToolErrorKind,
    pub message: String,
}

/// Failure raised inside a tool handler
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Failed(String),
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within a registry
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Whether a successful result is a renderable widget payload that
    /// should be handed to the display layer as-is
    fn produces_widget(&self) -> bool {
        false
    }

    /// Domain check run by the dispatcher ahead of schema validation. A
    /// returned envelope is the result of the call; the tool does not run.
    fn precheck(&self, _input: &Value) -> Option<ContentEnvelope> {
        None
    }

    /// Execute the tool. Input has already passed the precheck and schema
    /// validation when called through the dispatcher.
    async fn run(&self, input: Value) -> Result<ContentEnvelope, ToolError>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateToolName(String),
}

/// Collection of tools available to the agent.
///
/// Append-only while it is being populated; the dispatcher takes it behind
/// an `Arc`, after which nothing can register into it.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the storefront tools
    pub fn standard(catalog: Arc<Catalog>, checkout_base_url: &str) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(Arc::new(GetOffersTool::new(catalog.clone())))?;
        registry.register(Arc::new(CreatePurchaseLinkTool::new(checkout_base_url)))?;
        registry.register(Arc::new(GenerateOfferWidgetTool::new(catalog)))?;
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        if self.lookup(tool.name()).is_some() {
            return Err(RegistryError::DuplicateToolName(tool.name().to_string()));
        }
        tracing::debug!(tool = %tool.name(), "Registered tool");
        self.tools.push(tool);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Get all tool definitions for the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
