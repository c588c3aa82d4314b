//! Remote content API seam.
//!
//! The pipeline talks to the corpus through the [`Fetcher`] trait so the
//! same code runs against the live API or an in-process test double.

pub mod retry;
pub mod sefaria;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::IngestError;

pub use retry::RetryPolicy;
pub use sefaria::SefariaClient;

/// Body returned in place of anything that is not JSON
pub const EMPTY_OBJECT: &str = "{}";

/// Source of raw API responses
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Human-readable fetcher name
    fn name(&self) -> &str;

    /// GET an API-relative path (`/shape/Genesis`) and return the body.
    ///
    /// Bodies that do not look like JSON come back as `"{}"`.
    async fn fetch(&self, path: &str) -> Result<String, IngestError>;
}

/// Encode a book title for use inside an API path
pub fn encode_title(title: &str) -> String {
    title.trim().replace(' ', "%20")
}

/// Whether a body looks like a JSON document
pub fn looks_like_json(body: &str) -> bool {
    matches!(body.trim_start().as_bytes().first(), Some(b'{') | Some(b'['))
}

/// Fetch and parse a JSON body, surfacing API-reported errors
pub async fn fetch_json(fetcher: &dyn Fetcher, path: &str) -> Result<Value, IngestError> {
    let body = fetcher.fetch(path).await?;
    let value: Value =
        serde_json::from_str(&body).map_err(|e| IngestError::parse(path.to_string(), e))?;

    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(IngestError::Api {
            path: path.to_string(),
            message,
        });
    }

    Ok(value)
}
