//! Offer catalog
//!
//! Process-wide, immutable after construction. Tools read from it but never
//! mutate it, so a single `Arc<Catalog>` is shared by every dispatch.

use serde::{Deserialize, Serialize};

/// Category used when a lookup names no category or an unknown one
pub const DEFAULT_CATEGORY: &str = "home";

/// A purchasable offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub description: String,
}

impl Offer {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            description: description.into(),
        }
    }

    /// Price rendered for display, e.g. `$29.99`
    pub fn formatted_price(&self) -> String {
        format!("${:.2}", self.price)
    }
}

/// A named group of offers
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub offers: Vec<Offer>,
}

/// Immutable collection of offer categories
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    default_category: String,
}

impl Catalog {
    /// Build a catalog. `default_category` must name one of `categories`
    /// for the fallback policy to return anything.
    pub fn new(categories: Vec<Category>, default_category: impl Into<String>) -> Self {
        Self {
            categories,
            default_category: default_category.into(),
        }
    }

    /// The built-in demo catalog
    pub fn mock() -> Self {
        Self::new(
            vec![
                Category {
                    name: "home".to_string(),
                    offers: vec![
                        Offer::new(
                            "home_basic",
                            "Home Basic",
                            29.99,
                            "100 Mbps fibre with free installation.",
                        ),
                        Offer::new(
                            "home_pro",
                            "Home Pro",
                            49.99,
                            "1 Gbps fibre, mesh Wi-Fi and priority support.",
                        ),
                    ],
                },
                Category {
                    name: "mobile".to_string(),
                    offers: vec![
                        Offer::new(
                            "mobile_lite",
                            "Mobile Lite",
                            15.0,
                            "10 GB of data with unlimited calls and texts.",
                        ),
                        Offer::new(
                            "mobile_unlimited",
                            "Mobile Unlimited",
                            45.0,
                            "Unlimited 5G data, calls and roaming in the EU.",
                        ),
                    ],
                },
                Category {
                    name: "business".to_string(),
                    offers: vec![
                        Offer::new(
                            "business_starter",
                            "Business Starter",
                            79.0,
                            "Symmetric 500 Mbps line with a static IP.",
                        ),
                        Offer::new(
                            "business_plus",
                            "Business Plus",
                            129.0,
                            "Dedicated 2 Gbps line, 4-hour repair SLA and backup LTE.",
                        ),
                    ],
                },
            ],
            DEFAULT_CATEGORY,
        )
    }

    /// Resolve a requested category to the category actually served.
    ///
    /// The request is trimmed and lower-cased. Absent or unrecognized
    /// requests fall back to the default category; that is policy, not an
    /// error.
    pub fn select_category(&self, requested: Option<&str>) -> Option<&Category> {
        requested
            .map(|c| c.trim().to_lowercase())
            .and_then(|normalized| self.categories.iter().find(|c| c.name == normalized))
            .or_else(|| self.category(&self.default_category))
    }

    /// Exact lookup by (already normalized) category name
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Find an offer by id across all categories
    pub fn offer(&self, id: &str) -> Option<&Offer> {
        self.categories
            .iter()
            .flat_map(|c| c.offers.iter())
            .find(|o| o.id == id)
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }
}
