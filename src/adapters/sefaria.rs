//! HTTP client for the Sefaria content API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::{looks_like_json, Fetcher, RetryPolicy, EMPTY_OBJECT};
use crate::error::IngestError;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://www.sefaria.org/api";

/// Characters of each response body written to the debug log
const PREVIEW_CHARS: usize = 100;

/// Connection settings for [`SefariaClient`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    /// Timeout for a single HTTP request
    pub request_timeout: Duration,
    /// Upper bound for one `fetch`, retries included
    pub deadline: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            deadline: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of one HTTP attempt
enum Attempt {
    Done(String),
    Retry(String),
}

/// Sefaria API client with bounded retries
pub struct SefariaClient {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl SefariaClient {
    /// Create a client from settings
    pub fn new(settings: ClientSettings) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| IngestError::Network {
                path: settings.base_url.clone(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { settings, client })
    }

    /// Build the full URL for an API-relative path
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// One GET request
    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Attempt::Retry(format!("HTTP {}", status));
        }

        match response.text().await {
            Ok(body) => Attempt::Done(body),
            Err(e) => Attempt::Retry(e.to_string()),
        }
    }

    async fn fetch_with_retry(&self, path: &str) -> Result<String, IngestError> {
        let url = self.url(path);
        let policy = &self.settings.retry;
        let mut attempt = 1;

        loop {
            debug!(url = %url, attempt, "GET");

            match self.attempt(&url).await {
                Attempt::Done(body) => {
                    let preview: String = body.chars().take(PREVIEW_CHARS).collect();
                    debug!(path, preview = %preview, "Response");

                    if !looks_like_json(&body) {
                        warn!(path, "Non-JSON response, treating as empty");
                        return Ok(EMPTY_OBJECT.to_string());
                    }
                    return Ok(body);
                }
                Attempt::Retry(message) => {
                    if !policy.should_retry(attempt) {
                        return Err(IngestError::Network {
                            path: path.to_string(),
                            message: format!("{} (after {} attempts)", message, attempt),
                        });
                    }

                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Request failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for SefariaClient {
    fn name(&self) -> &str {
        "sefaria"
    }

    async fn fetch(&self, path: &str) -> Result<String, IngestError> {
        match timeout(self.settings.deadline, self.fetch_with_retry(path)).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::Network {
                path: path.to_string(),
                message: format!("Deadline of {:?} exceeded", self.settings.deadline),
            }),
        }
    }
}
