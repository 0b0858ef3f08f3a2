//! `generateOfferWidget` tool - render offers as a self-contained HTML fragment
//!
//! Each rendered offer carries an action descriptor pointing back at
//! `createPurchaseLink`. The display layer turns a click on it into a new
//! conversational turn, which is how UI re-enters the tool pipeline.

use super::{ContentEnvelope, Status, Tool, ToolError};
use crate::catalog::{Catalog, Offer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::Arc;

/// Tool the embedded purchase buttons invoke
pub const PURCHASE_ACTION_TOOL: &str = "createPurchaseLink";

/// Structured result of a widget-producing tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetPayload {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_data: Option<WidgetData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetData {
    pub html: String,
    pub metadata: WidgetMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetMetadata {
    /// Offer ids in render order
    pub offers: Vec<String>,
}

/// A callable action embedded in rendered HTML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub tool: String,
    pub args: Value,
}

impl ActionDescriptor {
    pub fn purchase(offer_id: &str) -> Self {
        Self {
            tool: PURCHASE_ACTION_TOOL.to_string(),
            args: json!({ "offer_id": offer_id }),
        }
    }

    /// Collect every `data-action` descriptor from a rendered fragment, in
    /// document order. Attributes that don't decode are skipped.
    #[cfg(test)]
    pub fn extract(html: &str) -> Vec<ActionDescriptor> {
        html.split("data-action=\"")
            .skip(1)
            .filter_map(|chunk| chunk.split_once('"'))
            .filter_map(|(attr, _)| serde_json::from_str(&unescape_html(attr)).ok())
            .collect()
    }
}

/// Render offers into a widget payload. Order and duplicates are kept as given.
pub fn generate_widget(offers: &[Offer]) -> WidgetPayload {
    if offers.is_empty() {
        return WidgetPayload {
            status: Status::Error,
            widget_data: None,
            message: Some("No offers to display.".to_string()),
        };
    }

    let mut html = String::from("<div class=\"offer-widget\">");
    for offer in offers {
        render_offer(&mut html, offer);
    }
    html.push_str("</div>");

    WidgetPayload {
        status: Status::Success,
        widget_data: Some(WidgetData {
            html,
            metadata: WidgetMetadata {
                offers: offers.iter().map(|o| o.id.clone()).collect(),
            },
        }),
        message: None,
    }
}

fn render_offer(html: &mut String, offer: &Offer) {
    let action = serde_json::to_string(&ActionDescriptor::purchase(&offer.id)).unwrap_or_default();
    let _ = write!(
        html,
        "<div class=\"offer-card\" data-offer-id=\"{id}\">\
         <h3 class=\"offer-name\">{name}</h3>\
         <p class=\"offer-price\">{price}</p>\
         <p class=\"offer-description\">{description}</p>\
         <button type=\"button\" class=\"offer-buy\" data-action=\"{action}\">Buy now</button>\
         </div>",
        id = escape_html(&offer.id),
        name = escape_html(&offer.name),
        price = escape_html(&offer.formatted_price()),
        description = escape_html(&offer.description),
        action = escape_html(&action),
    );
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
fn unescape_html(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Widget input accepts full offers or ids resolved against the catalog
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OfferRef {
    Id(String),
    Offer(Offer),
}

#[derive(Debug, Deserialize)]
struct WidgetInput {
    offers: Vec<OfferRef>,
}

pub struct GenerateOfferWidgetTool {
    catalog: Arc<Catalog>,
}

impl GenerateOfferWidgetTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    fn resolve(&self, refs: Vec<OfferRef>) -> Result<Vec<Offer>, ToolError> {
        refs.into_iter()
            .map(|r| match r {
                OfferRef::Id(id) => self
                    .catalog
                    .offer(&id)
                    .cloned()
                    .ok_or_else(|| ToolError::Failed(format!("unknown offer id '{id}'"))),
                OfferRef::Offer(offer) if offer.price < 0.0 => Err(ToolError::Failed(
                    format!("offer '{}' has an invalid price", offer.id),
                )),
                OfferRef::Offer(offer) => Ok(offer),
            })
            .collect()
    }
}

#[async_trait]
impl Tool for GenerateOfferWidgetTool {
    fn name(&self) -> &'static str {
        "generateOfferWidget"
    }

    fn description(&self) -> String {
        "Show offers to the user as an interactive card list with purchase buttons. \
         Pass the offers returned by getOffers (objects or ids), in the order to display."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["offers"],
            "properties": {
                "offers": {
                    "type": "array",
                    "description": "Offers to render",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "name": { "type": "string" },
                            "price": { "type": "number" },
                            "description": { "type": "string" }
                        }
                    }
                }
            }
        })
    }

    fn produces_widget(&self) -> bool {
        true
    }

    async fn run(&self, input: Value) -> Result<ContentEnvelope, ToolError> {
        let input: WidgetInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let offers = self.resolve(input.offers)?;
        let payload = generate_widget(&offers);
        let is_error = payload.status == Status::Error;

        Ok(ContentEnvelope {
            is_error,
            ..ContentEnvelope::json(&payload)
        })
    }
}
