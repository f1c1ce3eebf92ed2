//! External store client
//!
//! Receipts live in a managed Postgres exposed over a PostgREST-style API.
//! Reads are always filtered by id AND owner in a single query, so record
//! existence is never observable independent of ownership.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::models::Receipt;

/// Shape check for path-supplied receipt ids: hex digits and hyphens, length
/// 32-36. A cheap guard before the store is consulted, not a format
/// validator.
pub fn validate_receipt_id(id: &str) -> Result<()> {
    let ok = (32..=36).contains(&id.len())
        && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-');

    if ok {
        Ok(())
    } else {
        Err(Error::BadId(id.to_string()))
    }
}

/// Read access to stored receipts.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Fetch one receipt with its line items, matching both id and owner.
    /// `None` covers both an unknown id and an id owned by someone else.
    async fn fetch_receipt(&self, id: &str, owner: &str) -> Result<Option<Receipt>>;
}

/// HTTP client for the managed store.
pub struct HttpStore {
    http_client: Client,
    base_url: String,
    service_key: String,
}

impl HttpStore {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    /// Create from environment variables. Returns `None` when the store is
    /// not configured, which disables the export surface.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok()?;
        let key = std::env::var("SUPABASE_SERVICE_ROLE_KEY").ok()?;
        Some(Self::new(&url, &key))
    }

    /// Store host, for startup logging.
    pub fn host(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ReceiptStore for HttpStore {
    async fn fetch_receipt(&self, id: &str, owner: &str) -> Result<Option<Receipt>> {
        let response = self
            .http_client
            .get(format!("{}/rest/v1/receipts", self.base_url))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", owner)),
                ("select", "*,receipt_items(*)".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "store query failed");
            return Err(Error::Store(format!("store returned {}", status)));
        }

        let mut rows: Vec<Receipt> = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("invalid store response: {}", e)))?;

        debug!(rows = rows.len(), "store lookup");
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }
}
