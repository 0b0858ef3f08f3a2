//! Agent boundary error types

use thiserror::Error;

/// Agent boundary error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AgentError {
    pub kind: AgentErrorKind,
    pub message: String,
}

impl AgentError {
    pub fn new(kind: AgentErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::InvalidRequest, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Malformed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Unknown, message)
    }

    /// Whether this is a malformed-response failure rather than a
    /// transport-level one
    pub fn is_malformed(&self) -> bool {
        self.kind == AgentErrorKind::Malformed
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentErrorKind {
    /// Network issues, connection failures
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403) or no credentials configured
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Response didn't have the expected shape
    Malformed,
    /// Call didn't complete in time
    Timeout,
    /// Unknown error
    Unknown,
}

impl AgentErrorKind {
    /// Transient failures a user retry might fix. Nothing retries
    /// automatically; failed agent calls log it.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimit | Self::ServerError | Self::Timeout
        )
    }
}
