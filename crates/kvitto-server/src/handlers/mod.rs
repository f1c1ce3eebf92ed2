//! HTTP request handlers

mod analyze;
mod export;

pub use analyze::analyze_receipt;
pub use export::export_receipt_csv;

use axum::Json;

/// GET / - liveness probe
pub async fn hello() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "hello": "world" }))
}
