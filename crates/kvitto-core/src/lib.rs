//! kvitto Core Library
//!
//! Shared functionality for the kvitto receipt backend:
//! - Bearer-token verification against the auth provider's signing secret
//! - Receipt and line-item records as served by the external store
//! - CSV export formatting for stored receipts
//! - Store client for ownership-filtered receipt reads
//! - Model-provider client and JSON recovery for receipt analysis

pub mod ai;
pub mod auth;
pub mod error;
pub mod export;
pub mod models;
pub mod prompts;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub use ai::MockBackend;
pub use ai::{GeminiBackend, ModelBackend};
pub use error::{Error, Result};
pub use export::{build_receipt_csv, escape_csv_field, format_amount, format_date};
pub use models::{LineItem, RawAmount, Receipt};
pub use store::{validate_receipt_id, HttpStore, ReceiptStore};
