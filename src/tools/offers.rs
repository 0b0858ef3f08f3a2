//! `getOffers` tool - list the offers of one catalog category

use super::{ContentEnvelope, Tool, ToolError};
use crate::catalog::{Catalog, Offer};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GetOffersTool {
    catalog: Arc<Catalog>,
}

impl GetOffersTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[derive(Debug, Serialize)]
struct OffersResult<'a> {
    category: &'a str,
    offers: &'a [Offer],
}

#[async_trait]
impl Tool for GetOffersTool {
    fn name(&self) -> &'static str {
        "getOffers"
    }

    fn description(&self) -> String {
        format!(
            "List the available offers for a product category. Known categories: {}. \
             An omitted or unrecognized category returns the '{}' offers.",
            self.catalog.category_names().join(", "),
            self.catalog.default_category()
        )
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Product category, case-insensitive"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> Result<ContentEnvelope, ToolError> {
        // Anything that isn't a string is treated like an absent category
        let requested = input.get("category").and_then(Value::as_str);
        let category = self.catalog.select_category(requested).ok_or_else(|| {
            ToolError::Failed(format!(
                "default category '{}' is not in the catalog",
                self.catalog.default_category()
            ))
        })?;

        if requested.is_some_and(|r| !r.trim().eq_ignore_ascii_case(&category.name)) {
            tracing::debug!(
                requested = ?requested,
                served = %category.name,
                "Unrecognized category, serving default"
            );
        }

        Ok(ContentEnvelope::json(&OffersResult {
            category: &category.name,
            offers: &category.offers,
        }))
    }
}
