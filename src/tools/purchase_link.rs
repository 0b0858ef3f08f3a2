//! `createPurchaseLink` tool - mint a checkout URL for an offer

use super::{ContentEnvelope, Status, Tool, ToolError, ToolErrorKind};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const SUFFIX_LEN: usize = 8;

pub struct CreatePurchaseLinkTool {
    base_url: String,
}

impl CreatePurchaseLinkTool {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn link_for(&self, offer_id: &str) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        format!("{}/{}-{}", self.base_url, offer_id.to_lowercase(), suffix)
    }
}

#[derive(Debug, Deserialize)]
struct PurchaseLinkInput {
    #[serde(default)]
    offer_id: Option<String>,
}

/// Soft error: the model should go back to the user for clarification
fn missing_offer_id() -> ContentEnvelope {
    ContentEnvelope::error(
        ToolErrorKind::MissingOfferId,
        "No offer_id was provided. Ask the user which offer they would like to purchase.",
    )
}

fn is_blank(offer_id: &Value) -> bool {
    match offer_id {
        Value::Null => true,
        Value::String(id) => id.trim().is_empty(),
        _ => false,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseLink {
    pub status: Status,
    pub offer_id: String,
    pub url: String,
}

#[async_trait]
impl Tool for CreatePurchaseLinkTool {
    fn name(&self) -> &'static str {
        "createPurchaseLink"
    }

    fn description(&self) -> String {
        "Create a one-time checkout link for an offer the user chose. Requires the offer id; \
         if you don't know which offer the user wants, ask them first."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["offer_id"],
            "properties": {
                "offer_id": {
                    "type": "string",
                    "description": "Id of the offer to buy, e.g. home_basic"
                }
            }
        })
    }

    fn precheck(&self, input: &Value) -> Option<ContentEnvelope> {
        is_blank(input.get("offer_id").unwrap_or(&Value::Null)).then(missing_offer_id)
    }

    async fn run(&self, input: Value) -> Result<ContentEnvelope, ToolError> {
        let input: PurchaseLinkInput = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let Some(offer_id) = input
            .offer_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
        else {
            return Ok(missing_offer_id());
        };

        let url = self.link_for(&offer_id);
        tracing::info!(offer_id = %offer_id, "Created purchase link");

        Ok(ContentEnvelope::json(&PurchaseLink {
            status: Status::Success,
            offer_id,
            url,
        }))
    }
}
