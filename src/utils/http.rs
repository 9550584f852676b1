// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::{PublisherConfig, ScraperConfig};

/// Create a configured asynchronous HTTP client for publishing.
pub fn create_async_client(
    scraper: &ScraperConfig,
    publisher: &PublisherConfig,
) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&scraper.user_agent)
        .timeout(Duration::from_secs(publisher.timeout_secs))
        .build()?;
    Ok(client)
}

/// Response body for error reporting, capped so logs stay readable.
pub async fn error_body(response: reqwest::Response) -> String {
    const LIMIT: usize = 500;

    let text = response.text().await.unwrap_or_default();
    if text.chars().count() <= LIMIT {
        return text;
    }
    let truncated: String = text.chars().take(LIMIT).collect();
    format!("{truncated}…")
}
