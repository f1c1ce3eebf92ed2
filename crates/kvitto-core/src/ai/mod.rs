//! Model-provider abstraction
//!
//! One hosted multimodal backend plus a mock for tests, behind a common
//! trait so the server takes whichever it is handed at construction time.
//!
//! Backends are asked for raw JSON but routinely wrap it in markdown fences
//! or prose; `parsing` recovers the payload before callers see it.

mod gemini;
#[cfg(any(test, feature = "test-utils"))]
mod mock;
pub mod parsing;

pub use gemini::GeminiBackend;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Interface to the hosted multimodal model.
///
/// Implementations must be Send + Sync so one handle can serve all requests.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Submit one image and the fixed instruction prompt; return the JSON
    /// value recovered from the model's text response, verbatim.
    async fn parse_receipt(&self, image: &[u8], mime_type: &str) -> Result<serde_json::Value>;

    /// Model name, for startup logging.
    fn model(&self) -> &str;
}
