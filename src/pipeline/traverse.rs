// src/pipeline/traverse.rs

//! Checkpoint diff traversal.
//!
//! The board lists postings newest first. Walking pages top to bottom
//! and stopping at the checkpoint yields exactly the postings published
//! since the last run.

use crate::error::Result;
use crate::models::{Posting, TraversalConfig};
use crate::services::PageReader;

/// Walks a paginated job table down to a checkpoint.
#[derive(Debug, Clone)]
pub struct DiffTraversal {
    link_base: String,
    max_pages: Option<usize>,
}

impl DiffTraversal {
    pub fn new(link_base: impl Into<String>) -> Self {
        Self {
            link_base: link_base.into(),
            max_pages: None,
        }
    }

    pub fn from_config(link_base: impl Into<String>, config: &TraversalConfig) -> Self {
        Self::new(link_base).with_max_pages(config.max_pages)
    }

    /// Stop after reading this many pages even without a checkpoint match.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Collect postings newer than `checkpoint`, newest first.
    ///
    /// When the checkpoint is found it is included as the last element,
    /// so a single-element result equal to the checkpoint means nothing
    /// new was posted. Without a checkpoint only the first page is read.
    /// If the checkpoint is on no page, every row on every page is returned.
    pub async fn collect_new_postings(
        &self,
        reader: &mut dyn PageReader,
        checkpoint: Option<&Posting>,
    ) -> Result<Vec<Posting>> {
        reader.ensure_full_page_size().await?;

        let Some(checkpoint) = checkpoint else {
            log::info!("No checkpoint stored; reading first page only");
            let postings: Vec<Posting> = reader
                .current_rows()
                .await?
                .iter()
                .map(|row| Posting::from_row(row, &self.link_base))
                .collect();
            log::info!("First page holds {} postings", postings.len());
            return Ok(postings);
        };

        log::info!("Looking for checkpoint job {}", checkpoint.job_id);
        let mut postings = Vec::new();
        let mut pages_read = 0usize;

        loop {
            let rows = reader.current_rows().await?;
            pages_read += 1;

            for row in &rows {
                let posting = Posting::from_row(row, &self.link_base);
                let found = posting.same_job(checkpoint);
                postings.push(posting);
                if found {
                    log::info!(
                        "Checkpoint found on page {} after {} postings",
                        pages_read,
                        postings.len()
                    );
                    return Ok(postings);
                }
            }

            if !reader.has_next_page().await? {
                log::warn!(
                    "Checkpoint job {} not found in {} pages; returning all {} postings",
                    checkpoint.job_id,
                    pages_read,
                    postings.len()
                );
                return Ok(postings);
            }

            if self.max_pages.is_some_and(|max| pages_read >= max) {
                log::warn!(
                    "Stopped after {} pages without reaching checkpoint job {}",
                    pages_read,
                    checkpoint.job_id
                );
                return Ok(postings);
            }

            log::debug!("Advancing to page {}", pages_read + 1);
            reader.advance_page().await?;
        }
    }
}

/// Whether a traversal result carries nothing to publish.
pub fn is_unchanged(postings: &[Posting], checkpoint: Option<&Posting>) -> bool {
    match (postings, checkpoint) {
        ([], _) => true,
        ([only], Some(checkpoint)) => only.same_job(checkpoint),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::testing::{ScriptedPages, TEST_LINK_BASE, sample_posting};

    fn ids(postings: &[Posting]) -> Vec<&str> {
        postings.iter().map(|p| p.job_id.as_str()).collect()
    }

    fn traversal() -> DiffTraversal {
        DiffTraversal::new(TEST_LINK_BASE)
    }

    #[tokio::test]
    async fn test_stops_at_checkpoint_and_includes_it() {
        let mut reader =
            ScriptedPages::from_ids(&[&["4429010", "4429007", "4429004", "4429001", "4428990"]]);
        let checkpoint = sample_posting("4429004");

        let result = traversal()
            .collect_new_postings(&mut reader, Some(&checkpoint))
            .await
            .unwrap();

        assert_eq!(ids(&result), ["4429010", "4429007", "4429004"]);
        assert_eq!(result.last(), Some(&checkpoint));
        assert_eq!(reader.page_size_requests, 1);
        assert_eq!(reader.advances, 0);
    }

    #[tokio::test]
    async fn test_no_checkpoint_reads_first_page_only() {
        let first: Vec<String> = (0..100).map(|i| (5000 - i).to_string()).collect();
        let first: Vec<&str> = first.iter().map(String::as_str).collect();
        let mut reader = ScriptedPages::from_ids(&[first.as_slice(), &["1", "2"]]);

        let result = traversal()
            .collect_new_postings(&mut reader, None)
            .await
            .unwrap();

        assert_eq!(result.len(), 100);
        assert_eq!(ids(&result), first);
        assert_eq!(reader.advances, 0);
    }

    #[tokio::test]
    async fn test_follows_pages_until_checkpoint() {
        let mut reader = ScriptedPages::from_ids(&[&["9", "8"], &["7", "6"], &["5", "4"]]);
        let checkpoint = sample_posting("6");

        let result = traversal()
            .collect_new_postings(&mut reader, Some(&checkpoint))
            .await
            .unwrap();

        assert_eq!(ids(&result), ["9", "8", "7", "6"]);
        assert_eq!(reader.advances, 1);
    }

    #[tokio::test]
    async fn test_missing_checkpoint_returns_every_page() {
        let mut reader = ScriptedPages::from_ids(&[&["9", "8"], &["7"], &["6", "5"]]);
        let checkpoint = sample_posting("1");

        let result = traversal()
            .collect_new_postings(&mut reader, Some(&checkpoint))
            .await
            .unwrap();

        assert_eq!(ids(&result), ["9", "8", "7", "6", "5"]);
        assert_eq!(reader.advances, 2);
    }

    #[tokio::test]
    async fn test_checkpoint_on_first_row_is_unchanged() {
        let mut reader = ScriptedPages::from_ids(&[&["4429004", "4429001"]]);
        let checkpoint = sample_posting("4429004");

        let result = traversal()
            .collect_new_postings(&mut reader, Some(&checkpoint))
            .await
            .unwrap();

        assert_eq!(result, vec![checkpoint.clone()]);
        assert!(is_unchanged(&result, Some(&checkpoint)));
    }

    #[tokio::test]
    async fn test_empty_table_yields_nothing() {
        let mut reader = ScriptedPages::from_ids(&[&[]]);
        let checkpoint = sample_posting("1");

        let result = traversal()
            .collect_new_postings(&mut reader, Some(&checkpoint))
            .await
            .unwrap();
        assert!(result.is_empty());

        let mut reader = ScriptedPages::from_ids(&[&[]]);
        let result = traversal()
            .collect_new_postings(&mut reader, None)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_max_pages_caps_traversal() {
        let mut reader = ScriptedPages::from_ids(&[&["9"], &["8"], &["7"], &["6"]]);
        let checkpoint = sample_posting("1");

        let result = DiffTraversal::new(TEST_LINK_BASE)
            .with_max_pages(Some(2))
            .collect_new_postings(&mut reader, Some(&checkpoint))
            .await
            .unwrap();

        assert_eq!(ids(&result), ["9", "8"]);
        assert_eq!(reader.advances, 1);
    }

    #[tokio::test]
    async fn test_every_link_is_base_plus_id() {
        let mut reader = ScriptedPages::from_ids(&[&["3", "2", "1"]]);
        let result = traversal()
            .collect_new_postings(&mut reader, None)
            .await
            .unwrap();

        for posting in result {
            assert_eq!(posting.job_link, format!("{TEST_LINK_BASE}{}", posting.job_id));
        }
    }

    #[tokio::test]
    async fn test_reader_errors_propagate() {
        let mut reader = ScriptedPages::from_ids(&[&["9"], &["8"]]).failing_on_page(1);
        let checkpoint = sample_posting("1");

        let result = traversal()
            .collect_new_postings(&mut reader, Some(&checkpoint))
            .await;

        assert!(matches!(result, Err(AppError::NavigationTimeout { .. })));
    }

    #[test]
    fn test_unchanged_only_when_single_checkpoint_row() {
        let checkpoint = sample_posting("5");
        assert!(is_unchanged(&[], Some(&checkpoint)));
        assert!(is_unchanged(&[], None));
        assert!(is_unchanged(&[checkpoint.clone()], Some(&checkpoint)));
        assert!(!is_unchanged(&[sample_posting("6")], Some(&checkpoint)));
        assert!(!is_unchanged(&[checkpoint.clone()], None));
        assert!(!is_unchanged(
            &[sample_posting("6"), checkpoint.clone()],
            Some(&checkpoint)
        ));
    }
}
