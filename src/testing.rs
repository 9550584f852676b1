//! Testing utilities including mock implementations.
//!
//! These drive the pipeline without a browser or network access.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{DESCRIPTIVE_CELLS, Posting, RawRow};
use crate::services::{PageReader, PublishReceipt, Publisher};

/// Link base used by the helpers below.
pub const TEST_LINK_BASE: &str = "https://csc.gov.ph/career/job/";

/// A row with filler cells for the given job ID.
pub fn sample_row(job_id: &str) -> RawRow {
    let cells = (0..DESCRIPTIVE_CELLS)
        .map(|i| format!("cell{i}-{job_id}"))
        .collect();
    RawRow::new(cells, job_id)
}

/// The posting [`sample_row`] maps to under [`TEST_LINK_BASE`].
pub fn sample_posting(job_id: &str) -> Posting {
    Posting::from_row(&sample_row(job_id), TEST_LINK_BASE)
}

/// A [`PageReader`] over a fixed list of pages.
#[derive(Debug, Default)]
pub struct ScriptedPages {
    pages: Vec<Vec<RawRow>>,
    current: usize,
    fail_reading_page: Option<usize>,

    /// Call tracking for assertions
    pub page_size_requests: usize,
    pub rows_read: usize,
    pub advances: usize,
    pub closes: usize,
}

impl ScriptedPages {
    pub fn new(pages: Vec<Vec<RawRow>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Pages of rows built with [`sample_row`].
    pub fn from_ids(pages: &[&[&str]]) -> Self {
        Self::new(
            pages
                .iter()
                .map(|ids| ids.iter().map(|id| sample_row(id)).collect())
                .collect(),
        )
    }

    /// Fail `current_rows` with a timeout once page `index` (0-based) is reached.
    pub fn failing_on_page(mut self, index: usize) -> Self {
        self.fail_reading_page = Some(index);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closes > 0
    }
}

#[async_trait]
impl PageReader for ScriptedPages {
    async fn ensure_full_page_size(&mut self) -> Result<()> {
        self.page_size_requests += 1;
        Ok(())
    }

    async fn current_rows(&mut self) -> Result<Vec<RawRow>> {
        if self.fail_reading_page == Some(self.current) {
            return Err(AppError::navigation_timeout("table#jobs tbody tr", 0));
        }
        self.rows_read += 1;
        Ok(self.pages.get(self.current).cloned().unwrap_or_default())
    }

    async fn has_next_page(&mut self) -> Result<bool> {
        Ok(self.current + 1 < self.pages.len())
    }

    async fn advance_page(&mut self) -> Result<()> {
        if self.current + 1 >= self.pages.len() {
            return Err(AppError::navigation_timeout("#jobs_next", 0));
        }
        self.current += 1;
        self.advances += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}

/// A [`Publisher`] that records every batch it is handed.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<Vec<Posting>>>,
    failing: HashSet<usize>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the `index`-th call (0-based) with an HTTP 500 publish error.
    pub fn failing_batch(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    /// Every batch received, including failed ones, in call order.
    pub fn batches(&self) -> Vec<Vec<Posting>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_batch(&self, postings: &[Posting]) -> Result<PublishReceipt> {
        let index = {
            let mut batches = self.batches.lock().unwrap_or_else(PoisonError::into_inner);
            batches.push(postings.to_vec());
            batches.len() - 1
        };

        if self.failing.contains(&index) {
            return Err(AppError::publish(Some(500), "Internal Server Error"));
        }
        Ok(PublishReceipt {
            id: Some(format!("post_{index}")),
        })
    }
}
