//! AWS S3 checkpoint store.
//!
//! Stores the same JSON document as [`LocalStorage`](super::LocalStorage)
//! at `s3://{bucket}/{key}`, for Lambda deployments without a disk.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::Posting;
use crate::storage::{CheckpointData, RecordStore};

/// S3-based checkpoint store.
pub struct S3Storage {
    client: Client,
    bucket: String,
    key: String,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a store using credentials from the AWS environment.
    pub async fn from_env(bucket: &str, key: &str) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Ok(Self::new(Client::new(&config), bucket, key))
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    async fn load(&self) -> Result<CheckpointData> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| {
                        AppError::persistence(format!("failed to read {}: {}", self.location(), e))
                    })?;
                serde_json::from_slice(&bytes.into_bytes()).map_err(|e| {
                    AppError::persistence(format!("corrupt checkpoint at {}: {}", self.location(), e))
                })
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No existing checkpoint at {}", self.location());
                    Ok(CheckpointData::empty())
                } else {
                    Err(AppError::persistence(format!(
                        "failed to read {}: {}",
                        self.location(),
                        service_err
                    )))
                }
            }
        }
    }

    async fn save(&self, data: &CheckpointData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(ByteStream::from(json.into_bytes()))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| {
                AppError::persistence(format!("failed to write {}: {}", self.location(), e))
            })?;

        log::info!("Wrote {} records to {}", data.records.len(), self.location());
        Ok(())
    }
}

#[async_trait]
impl RecordStore for S3Storage {
    async fn get_latest(&self) -> Result<Option<Posting>> {
        Ok(self.load().await?.latest().cloned())
    }

    async fn insert(&self, posting: &Posting) -> Result<()> {
        let mut data = self.load().await?;
        if data.insert(posting) {
            self.save(&data).await?;
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.save(&CheckpointData::empty()).await
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load().await?.records.len())
    }

    async fn replace_checkpoint(&self, posting: &Posting) -> Result<()> {
        // One PUT instead of delete + read + write.
        self.save(&CheckpointData::new(vec![posting.clone()])).await
    }
}
