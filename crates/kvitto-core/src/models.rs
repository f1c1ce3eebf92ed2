//! Receipt records as returned by the external store
//!
//! These types are read-only here; the store owns the full lifecycle and this
//! service fetches them once per export request.

use serde::{Deserialize, Serialize};

/// A raw numeric field from the store. The store renders `numeric` columns as
/// JSON numbers but may fall back to strings for arbitrary precision, so both
/// forms are accepted and normalized at formatting time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl From<f64> for RawAmount {
    fn from(value: f64) -> Self {
        RawAmount::Number(value)
    }
}

/// A purchased line item belonging to a receipt. Order as returned by the
/// store is preserved through export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub price: Option<RawAmount>,
}

/// A stored receipt with its line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    /// Owner subject id; every lookup filters on this.
    pub user_id: String,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub total: Option<RawAmount>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "receipt_items", default)]
    pub items: Vec<LineItem>,
}
