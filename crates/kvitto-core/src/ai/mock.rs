//! Mock model backend for testing
//!
//! Returns a canned raw response, run through the same JSON recovery as the
//! real backend so tests exercise the full pipeline.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

use super::{parsing, ModelBackend};

/// Mock model backend with a configurable raw response.
#[derive(Clone)]
pub struct MockBackend {
    response: String,
}

impl MockBackend {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn parse_receipt(&self, _image: &[u8], _mime_type: &str) -> Result<Value> {
        parsing::parse_model_json(&self.response)
    }

    fn model(&self) -> &str {
        "mock"
    }
}
