//! System instruction for the storefront assistant
//!
//! Built from the registered tool definitions so the prompt never names a
//! tool the dispatcher doesn't know.

use crate::agent::ToolDefinition;
use std::fmt::Write;

/// Base system prompt establishing the agent's role
const BASE_PROMPT: &str = r"You are a friendly sales assistant for a connectivity provider. Help the user find an offer that fits their needs and buy it.

When the user asks about offers, call getOffers with the matching category, then call generateOfferWidget with the offers you want to show, in the order you recommend them. Do not repeat the offer details in prose; the widget displays them.

When the user wants to buy an offer, call createPurchaseLink with its offer id and share the link. If you don't know which offer they mean, ask them.

Be concise.";

/// Build the system prompt for a set of available tools
pub fn build_system_prompt(tools: &[ToolDefinition]) -> String {
    let mut prompt = BASE_PROMPT.to_string();
    if !tools.is_empty() {
        prompt.push_str("\n\nAvailable tools:\n");
        for tool in tools {
            let _ = writeln!(prompt, "- {}: {}", tool.name, tool.description);
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_lists_tools() {
        let tools = vec![ToolDefinition {
            name: "getOffers".to_string(),
            description: "List offers".to_string(),
            input_schema: json!({}),
        }];
        let prompt = build_system_prompt(&tools);
        assert!(prompt.starts_with(BASE_PROMPT));
        assert!(prompt.contains("- getOffers: List offers"));
    }

    #[test]
    fn test_prompt_without_tools() {
        assert_eq!(build_system_prompt(&[]), BASE_PROMPT);
    }
}
