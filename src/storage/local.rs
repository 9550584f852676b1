//! Local filesystem checkpoint store.
//!
//! Keeps the checkpoint in a single JSON document:
//!
//! ```text
//! {
//!   "updated_at": "2025-05-01T09:00:00Z",
//!   "records": [ { "jobid": "4429004", ... } ]
//! }
//! ```
//!
//! Every write goes to a temp file first and is renamed over the target,
//! so a crash never leaves a half-written checkpoint behind.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::Posting;
use crate::storage::{CheckpointData, RecordStore};

/// JSON file checkpoint store.
pub struct LocalStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a store backed by the given file. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn io_error(&self, action: &str, e: std::io::Error) -> AppError {
        AppError::persistence(format!(
            "failed to {} checkpoint file {}: {}",
            action,
            self.path.display(),
            e
        ))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.try_write_bytes(bytes)
            .await
            .map_err(|e| self.io_error("write", e))
    }

    async fn try_write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error("read", e)),
        }
    }

    async fn load(&self) -> Result<CheckpointData> {
        match self.read_bytes().await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::persistence(format!(
                    "corrupt checkpoint file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            None => Ok(CheckpointData::empty()),
        }
    }

    async fn save(&self, data: &CheckpointData) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(data)?;
        self.write_bytes(&bytes).await
    }
}

#[async_trait]
impl RecordStore for LocalStorage {
    async fn get_latest(&self) -> Result<Option<Posting>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.latest().cloned())
    }

    async fn insert(&self, posting: &Posting) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        if data.insert(posting) {
            self.save(&data).await?;
            log::debug!("Stored job {} in {}", posting.job_id, self.path.display());
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save(&CheckpointData::empty()).await
    }

    async fn count(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRow;
    use tempfile::TempDir;

    fn posting(id: &str) -> Posting {
        let cells = vec!["DOH".to_string(), "NCR".to_string()];
        Posting::from_row(&RawRow::new(cells, id), "https://csc.gov.ph/career/job/")
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("checkpoint.json"));

        assert!(storage.get_latest().await.unwrap().is_none());
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_checkpoint_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("checkpoint.json");

        LocalStorage::new(&path)
            .replace_checkpoint(&posting("4429004"))
            .await
            .unwrap();

        let reopened = LocalStorage::new(&path);
        let latest = reopened.get_latest().await.unwrap().unwrap();
        assert_eq!(latest.job_id, "4429004");
        assert_eq!(latest.agency, "DOH");
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_file_uses_jobid_field() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        let storage = LocalStorage::new(&path);
        storage.insert(&posting("77")).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["records"][0]["jobid"], "77");
        assert!(raw["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_delete_all_then_insert() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("checkpoint.json"));
        storage.insert(&posting("1")).await.unwrap();
        storage.insert(&posting("2")).await.unwrap();
        storage.insert(&posting("2")).await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 2);

        storage.delete_all().await.unwrap();
        assert!(storage.get_latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("checkpoint.json");
        std::fs::write(&path, b"{not json").unwrap();

        let result = LocalStorage::new(&path).get_latest().await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_unreadable_path_is_persistence_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        match storage.get_latest().await {
            Err(AppError::Persistence(message)) => {
                assert!(message.contains(&tmp.path().display().to_string()));
            }
            other => panic!("expected persistence error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unwritable_path_is_persistence_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let storage = LocalStorage::new(blocker.join("checkpoint.json"));

        let result = storage.replace_checkpoint(&posting("1")).await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
    }
}
