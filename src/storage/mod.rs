//! Checkpoint persistence.
//!
//! A store holds the single most recently published posting. The
//! pipeline reads it once per run and replaces it (delete-all + insert)
//! after the first batch is published.
//!
//! ## Backends
//!
//! ```text
//! sqlite  → {storage}/cscjobs.db      postreference table, latest by row id
//! json    → {storage}/checkpoint.json  records in insertion order
//! s3      → s3://{bucket}/{key}        same document as json
//! memory  → process-local              tests and dry runs
//! ```

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Posting, StoreBackend, StoreConfig};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

/// Trait for checkpoint store backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Most recently inserted posting, or `None` when the store is empty.
    async fn get_latest(&self) -> Result<Option<Posting>>;

    /// Insert a posting. Inserting a job ID that is already stored is a no-op.
    async fn insert(&self, posting: &Posting) -> Result<()>;

    /// Remove every stored posting.
    async fn delete_all(&self) -> Result<()>;

    /// Number of stored postings.
    async fn count(&self) -> Result<usize>;

    /// Replace whatever is stored with a single checkpoint posting.
    async fn replace_checkpoint(&self, posting: &Posting) -> Result<()> {
        self.delete_all().await?;
        self.insert(posting).await
    }

    /// Release connections held by the store.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Checkpoint document used by file and object backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    /// Stored postings, oldest first
    pub records: Vec<Posting>,
}

impl CheckpointData {
    pub fn new(records: Vec<Posting>) -> Self {
        Self {
            updated_at: Utc::now(),
            records,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Append unless the job ID is already present; returns whether it was added.
    pub fn insert(&mut self, posting: &Posting) -> bool {
        if self.records.iter().any(|r| r.same_job(posting)) {
            return false;
        }
        self.records.push(posting.clone());
        self.updated_at = Utc::now();
        true
    }

    pub fn latest(&self) -> Option<&Posting> {
        self.records.last()
    }
}

/// Open the store selected by configuration.
///
/// File paths are resolved against `root`.
pub async fn open_store(config: &StoreConfig, root: &Path) -> Result<Box<dyn RecordStore>> {
    log::info!("Opening {} checkpoint store", config.backend);
    match config.backend {
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => {
            let store = SqliteStorage::open(root.join(&config.sqlite_path)).await?;
            Ok(Box::new(store))
        }
        StoreBackend::Json => Ok(Box::new(LocalStorage::new(root.join(&config.json_path)))),
        #[cfg(feature = "s3")]
        StoreBackend::S3 => {
            let store = S3Storage::from_env(&config.s3_bucket, &config.s3_key).await?;
            Ok(Box::new(store))
        }
        StoreBackend::Memory => Ok(Box::new(MemoryStorage::new())),
        #[allow(unreachable_patterns)]
        other => Err(AppError::config(format!(
            "store backend '{other}' is not enabled in this build"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRow;

    fn posting(id: &str) -> Posting {
        Posting::from_row(&RawRow::new(vec![], id), "https://csc.gov.ph/career/job/")
    }

    #[test]
    fn test_checkpoint_data_insert_is_idempotent() {
        let mut data = CheckpointData::empty();
        assert!(data.insert(&posting("1")));
        assert!(data.insert(&posting("2")));
        assert!(!data.insert(&posting("1")));
        assert_eq!(data.records.len(), 2);
        assert_eq!(data.latest().unwrap().job_id, "2");
    }

    #[tokio::test]
    async fn test_open_store_json_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Json,
            ..StoreConfig::default()
        };
        let store = open_store(&config, tmp.path()).await.unwrap();
        store.insert(&posting("7")).await.unwrap();
        assert!(tmp.path().join("checkpoint.json").exists());
    }

    #[tokio::test]
    async fn test_replace_checkpoint_leaves_single_record() {
        let store = MemoryStorage::new();
        store.insert(&posting("1")).await.unwrap();
        store.insert(&posting("2")).await.unwrap();

        store.replace_checkpoint(&posting("9")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get_latest().await.unwrap().unwrap().job_id, "9");
    }
}
