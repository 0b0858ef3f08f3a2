//! Agent configuration from the environment

use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_MAX_TOOL_ROUNDS: u32 = 4;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the model client and the agent loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: Option<String>,
    /// Gateway base URL; when set the key is not appended to request URLs
    pub gateway: Option<String>,
    pub model: String,
    pub max_tool_rounds: u32,
    /// Bound on a single agent boundary call, `None` to wait forever
    pub timeout: Option<Duration>,
    /// Remote agent boundary; conversations use the in-process runner when unset
    pub remote_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway: None,
            model: DEFAULT_MODEL.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            remote_url: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_key: non_empty("GEMINI_API_KEY"),
            gateway: non_empty("LLM_GATEWAY"),
            model: non_empty("AGENT_MODEL").unwrap_or(defaults.model),
            max_tool_rounds: non_empty("AGENT_MAX_TOOL_ROUNDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tool_rounds),
            timeout: match non_empty("AGENT_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.timeout,
            },
            remote_url: non_empty("AGENT_REMOTE_URL"),
        }
    }

    /// Whether a model can be called at all
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() || self.gateway.is_some()
    }
}
