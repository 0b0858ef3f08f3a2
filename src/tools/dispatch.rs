//! Tool dispatch
//!
//! Looks a tool up, validates the input against its schema and runs it.
//! Every failure is folded into an error content item: callers always get an
//! envelope back.

use super::schema::{self, Violation};
use super::{ContentEnvelope, ToolErrorKind, ToolRegistry};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Failures absorbed at the dispatch boundary
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid input for tool '{tool}': {}", join_violations(.violations))]
    Validation {
        tool: String,
        violations: Vec<Violation>,
    },
    #[error("Tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },
}

impl DispatchError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            DispatchError::UnknownTool(_) => ToolErrorKind::UnknownTool,
            DispatchError::Validation { .. } => ToolErrorKind::ValidationError,
            DispatchError::Execution { .. } => ToolErrorKind::ToolExecutionError,
        }
    }

    pub fn into_envelope(self) -> ContentEnvelope {
        ContentEnvelope::error(self.kind(), self.to_string())
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Stateless, reentrant front door to the tool registry
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Whether `name` is a registered widget-producing tool
    pub fn produces_widget(&self, name: &str) -> bool {
        self.registry
            .lookup(name)
            .is_some_and(|t| t.produces_widget())
    }

    /// Dispatch a call. Never fails: errors come back as error content.
    pub async fn dispatch(&self, name: &str, input: Value) -> ContentEnvelope {
        let start = Instant::now();
        let result = self.try_dispatch(name, input).await;
        let duration_ms = start.elapsed().as_millis();

        match result {
            Ok(envelope) => {
                tracing::info!(
                    tool = %name,
                    duration_ms = %duration_ms,
                    is_error = envelope.is_error,
                    "Tool dispatched"
                );
                envelope
            }
            Err(e) => {
                tracing::warn!(
                    tool = %name,
                    duration_ms = %duration_ms,
                    kind = ?e.kind(),
                    error = %e,
                    "Tool dispatch failed"
                );
                e.into_envelope()
            }
        }
    }

    async fn try_dispatch(&self, name: &str, input: Value) -> Result<ContentEnvelope, DispatchError> {
        let tool = self
            .registry
            .lookup(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        if let Some(envelope) = tool.precheck(&input) {
            return Ok(envelope);
        }

        schema::validate(&tool.input_schema(), &input).map_err(|violations| {
            DispatchError::Validation {
                tool: name.to_string(),
                violations,
            }
        })?;

        // A panicking handler must not take the caller down with it
        match AssertUnwindSafe(tool.run(input)).catch_unwind().await {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(e)) => Err(DispatchError::Execution {
                tool: name.to_string(),
                message: e.to_string(),
            }),
            Err(panic) => Err(DispatchError::Execution {
                tool: name.to_string(),
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
