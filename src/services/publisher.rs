// src/services/publisher.rs

//! Feed publishing.
//!
//! New postings are rendered into a single text digest per batch and
//! posted to a Facebook Page feed through the Graph API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Credentials, Posting, PublisherConfig};
use crate::utils::http::error_body;

/// Acknowledgement returned by the feed for a published batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublishReceipt {
    /// ID of the created post, when the feed reports one
    #[serde(default)]
    pub id: Option<String>,
}

/// Destination for batches of new postings.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one batch as a single message.
    async fn publish_batch(&self, postings: &[Posting]) -> Result<PublishReceipt>;
}

/// Renders postings into a digest message.
#[derive(Debug, Clone)]
pub struct DigestFormatter {
    item_template: String,
    separator: String,
}

impl DigestFormatter {
    pub fn new(item_template: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            item_template: item_template.into(),
            separator: separator.into(),
        }
    }

    pub fn from_config(config: &PublisherConfig) -> Self {
        Self::new(&config.item_template, &config.separator)
    }

    /// Render a batch; `{index}` counts from 1 within the batch.
    pub fn format(&self, postings: &[Posting]) -> String {
        postings
            .iter()
            .enumerate()
            .map(|(i, posting)| posting.format_numbered(&self.item_template, i + 1))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

/// JSON body accepted by the feed endpoint.
#[derive(Serialize)]
struct FeedPost<'a> {
    message: &'a str,
    access_token: &'a str,
}

/// Publisher for a Facebook Page feed.
pub struct FacebookPublisher {
    client: Client,
    endpoint: String,
    access_token: SecretString,
    formatter: DigestFormatter,
}

impl FacebookPublisher {
    pub fn new(client: Client, config: &PublisherConfig, credentials: Credentials) -> Self {
        Self {
            client,
            endpoint: config.feed_url(&credentials.page_id),
            access_token: credentials.access_token,
            formatter: DigestFormatter::from_config(config),
        }
    }

    /// Feed endpoint this publisher posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Publisher for FacebookPublisher {
    async fn publish_batch(&self, postings: &[Posting]) -> Result<PublishReceipt> {
        let message = self.formatter.format(postings);
        let body = FeedPost {
            message: &message,
            access_token: self.access_token.expose_secret(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::publish(e.status().map(|s| s.as_u16()), e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_body(response).await;
            return Err(AppError::publish(Some(status.as_u16()), detail));
        }

        let receipt = response
            .json::<PublishReceipt>()
            .await
            .unwrap_or_default();
        log::info!(
            "Published {} postings (post id: {})",
            postings.len(),
            receipt.id.as_deref().unwrap_or("unknown")
        );
        Ok(receipt)
    }
}
