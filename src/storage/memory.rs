//! In-memory checkpoint store.
//!
//! Data is lost when the process exits; used for tests and dry runs.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::Posting;
use crate::storage::{CheckpointData, RecordStore};

/// Process-local checkpoint store.
pub struct MemoryStorage {
    data: Mutex<CheckpointData>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(CheckpointData::empty()),
        }
    }

    /// Store seeded with a checkpoint.
    pub fn with_checkpoint(posting: Posting) -> Self {
        Self {
            data: Mutex::new(CheckpointData::new(vec![posting])),
        }
    }

    /// Snapshot of every stored posting, oldest first.
    pub async fn records(&self) -> Vec<Posting> {
        self.data.lock().await.records.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStorage {
    async fn get_latest(&self) -> Result<Option<Posting>> {
        Ok(self.data.lock().await.latest().cloned())
    }

    async fn insert(&self, posting: &Posting) -> Result<()> {
        self.data.lock().await.insert(posting);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        *self.data.lock().await = CheckpointData::empty();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.data.lock().await.records.len())
    }
}
