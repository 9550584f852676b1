// src/pipeline/run.rs

//! One scrape-and-publish run.
//!
//! checkpoint → traversal → batch publish → checkpoint update

use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, Posting};
use crate::pipeline::traverse::{DiffTraversal, is_unchanged};
use crate::services::{PageReader, Publisher};
use crate::storage::RecordStore;

/// Per-run knobs that callers may override on top of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Postings per published message
    pub batch_size: usize,
    /// Traverse and report, but neither publish nor touch the store
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(batch_size: usize, dry_run: bool) -> Self {
        Self {
            batch_size: batch_size.max(1),
            dry_run,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.publisher.batch_size, false)
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Postings selected for publishing (the checkpoint row included)
    pub found: usize,
    /// Batches attempted
    pub batches: usize,
    /// Postings in batches the feed accepted
    pub published: usize,
    /// Postings in batches the feed rejected
    pub failed: usize,
    /// Whether the stored checkpoint was replaced
    pub checkpoint_updated: bool,
    /// The postings themselves, newest first
    pub postings: Vec<Posting>,
}

/// Drives a run against explicit reader, store and publisher handles.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    traversal: DiffTraversal,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(traversal: DiffTraversal, options: RunOptions) -> Self {
        Self { traversal, options }
    }

    pub fn from_config(config: &Config, options: RunOptions) -> Self {
        let traversal =
            DiffTraversal::from_config(&config.scraper.job_link_base, &config.traversal);
        Self::new(traversal, options)
    }

    /// Run the full pipeline.
    ///
    /// The reader is closed before anything is published, whether or
    /// not traversal succeeded. Publish failures are logged and skipped;
    /// store failures end the run.
    pub async fn run(
        &self,
        reader: &mut dyn PageReader,
        store: &dyn RecordStore,
        publisher: &dyn Publisher,
    ) -> Result<RunSummary> {
        crate::utils::log::header("CSC job watch");
        let (checkpoint, postings) = self.collect_and_close(reader, store).await?;

        if is_unchanged(&postings, checkpoint.as_ref()) {
            log::info!("No new jobs found. Nothing to post.");
            return Ok(RunSummary::default());
        }

        let mut summary = RunSummary {
            found: postings.len(),
            ..RunSummary::default()
        };

        if self.options.dry_run {
            log::info!(
                "Dry run: {} postings would be published in {} batches",
                postings.len(),
                postings.len().div_ceil(self.options.batch_size)
            );
            for posting in &postings {
                crate::utils::log::posting(posting);
            }
            summary.postings = postings;
            return Ok(summary);
        }

        log::info!(
            "Found {} new jobs. Posting in batches of {}...",
            postings.len(),
            self.options.batch_size
        );
        self.publish_batches(&postings, store, publisher, &mut summary)
            .await?;
        summary.postings = postings;

        crate::utils::log::summary(
            "Run complete",
            &[
                ("Found", summary.found.to_string()),
                ("Batches", summary.batches.to_string()),
                ("Published", summary.published.to_string()),
                ("Failed", summary.failed.to_string()),
                ("Checkpoint updated", summary.checkpoint_updated.to_string()),
            ],
        );
        Ok(summary)
    }

    /// Traverse only: return what a run would publish, without publishing.
    pub async fn scrape(
        &self,
        reader: &mut dyn PageReader,
        store: &dyn RecordStore,
    ) -> Result<Vec<Posting>> {
        let (_, postings) = self.collect_and_close(reader, store).await?;
        Ok(postings)
    }

    async fn collect_and_close(
        &self,
        reader: &mut dyn PageReader,
        store: &dyn RecordStore,
    ) -> Result<(Option<Posting>, Vec<Posting>)> {
        let collected = self.collect(reader, store).await;
        if let Err(e) = reader.close().await {
            log::warn!("Failed to close page reader: {}", e);
        }
        collected
    }

    async fn collect(
        &self,
        reader: &mut dyn PageReader,
        store: &dyn RecordStore,
    ) -> Result<(Option<Posting>, Vec<Posting>)> {
        let checkpoint = store.get_latest().await?;
        match &checkpoint {
            Some(latest) => log::info!("Latest job id {} ({})", latest.job_id, latest.position),
            None => log::info!("No checkpoint stored yet"),
        }

        let postings = self
            .traversal
            .collect_new_postings(reader, checkpoint.as_ref())
            .await?;
        Ok((checkpoint, postings))
    }

    async fn publish_batches(
        &self,
        postings: &[Posting],
        store: &dyn RecordStore,
        publisher: &dyn Publisher,
        summary: &mut RunSummary,
    ) -> Result<()> {
        for (index, batch) in postings.chunks(self.options.batch_size).enumerate() {
            summary.batches += 1;
            log::info!("Posting batch {} with {} jobs...", index + 1, batch.len());

            match publisher.publish_batch(batch).await {
                Ok(_) => {
                    summary.published += batch.len();
                    if !summary.checkpoint_updated {
                        if let Some(newest) = postings.first() {
                            store.replace_checkpoint(newest).await?;
                            log::info!("Checkpoint moved to job {}", newest.job_id);
                            summary.checkpoint_updated = true;
                        }
                    }
                }
                Err(e) if !e.is_fatal() => {
                    log::error!(
                        "Failed to post batch starting from index {}: {}",
                        index * self.options.batch_size,
                        e
                    );
                    summary.failed += batch.len();
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Run the pipeline against the live board in a Chromium tab.
#[cfg(feature = "browser")]
pub async fn run_scraper(
    config: &Config,
    store: &dyn RecordStore,
    publisher: &dyn Publisher,
    options: RunOptions,
) -> Result<RunSummary> {
    let mut reader = crate::services::ChromeTableReader::open(&config.scraper).await?;
    Orchestrator::from_config(config, options)
        .run(&mut reader, store, publisher)
        .await
}

/// Run against the live board with everything wired from configuration.
///
/// Credentials are read before the browser or store is touched. The
/// store is closed on every path.
#[cfg(feature = "browser")]
pub async fn run_from_config(
    config: &Config,
    storage_dir: &std::path::Path,
    options: RunOptions,
) -> Result<RunSummary> {
    let credentials = crate::models::Credentials::from_env()?;
    let client = crate::utils::http::create_async_client(&config.scraper, &config.publisher)?;
    let publisher =
        crate::services::FacebookPublisher::new(client, &config.publisher, credentials);
    log::info!("Publishing to {}", publisher.endpoint());

    let store = crate::storage::open_store(&config.store, storage_dir).await?;
    let result = run_scraper(config, store.as_ref(), &publisher, options).await;
    if let Err(e) = store.close().await {
        log::warn!("Failed to close checkpoint store: {}", e);
    }
    result
}

/// Traverse the live board without publishing.
#[cfg(feature = "browser")]
pub async fn scrape_board(config: &Config, store: &dyn RecordStore) -> Result<Vec<Posting>> {
    let mut reader = crate::services::ChromeTableReader::open(&config.scraper).await?;
    Orchestrator::from_config(config, RunOptions::from_config(config))
        .scrape(&mut reader, store)
        .await
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::storage::MemoryStorage;
    use crate::testing::{
        RecordingPublisher, ScriptedPages, TEST_LINK_BASE, sample_posting,
    };

    fn orchestrator(batch_size: usize) -> Orchestrator {
        Orchestrator::new(
            DiffTraversal::new(TEST_LINK_BASE),
            RunOptions::new(batch_size, false),
        )
    }

    fn ids(postings: &[Posting]) -> Vec<&str> {
        postings.iter().map(|p| p.job_id.as_str()).collect()
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn get_latest(&self) -> Result<Option<Posting>> {
            Err(AppError::persistence("database is locked"))
        }
        async fn insert(&self, _posting: &Posting) -> Result<()> {
            Err(AppError::persistence("database is locked"))
        }
        async fn delete_all(&self) -> Result<()> {
            Err(AppError::persistence("database is locked"))
        }
        async fn count(&self) -> Result<usize> {
            Err(AppError::persistence("database is locked"))
        }
    }

    #[tokio::test]
    async fn test_first_run_publishes_first_page_and_seeds_checkpoint() {
        let mut reader = ScriptedPages::from_ids(&[&["30", "29", "28"], &["27"]]);
        let store = MemoryStorage::new();
        let publisher = RecordingPublisher::new();

        let summary = orchestrator(150)
            .run(&mut reader, &store, &publisher)
            .await
            .unwrap();

        assert_eq!(summary.found, 3);
        assert_eq!(summary.published, 3);
        assert!(summary.checkpoint_updated);
        assert_eq!(publisher.batches().len(), 1);
        assert_eq!(store.records().await, vec![sample_posting("30")]);
        assert!(reader.is_closed());
    }

    #[tokio::test]
    async fn test_publishes_down_to_checkpoint_inclusive() {
        let mut reader = ScriptedPages::from_ids(&[&["9", "8", "4429004", "7"]]);
        let store = MemoryStorage::with_checkpoint(sample_posting("4429004"));
        let publisher = RecordingPublisher::new();

        let summary = orchestrator(150)
            .run(&mut reader, &store, &publisher)
            .await
            .unwrap();

        assert_eq!(ids(&summary.postings), ["9", "8", "4429004"]);
        assert_eq!(ids(&publisher.batches()[0]), ["9", "8", "4429004"]);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get_latest().await.unwrap().unwrap().job_id, "9");
    }

    #[tokio::test]
    async fn test_unchanged_board_publishes_nothing() {
        let mut reader = ScriptedPages::from_ids(&[&["5", "4"]]);
        let store = MemoryStorage::with_checkpoint(sample_posting("5"));
        let publisher = RecordingPublisher::new();

        let summary = orchestrator(150)
            .run(&mut reader, &store, &publisher)
            .await
            .unwrap();

        assert_eq!(summary, RunSummary::default());
        assert!(publisher.batches().is_empty());
        assert_eq!(store.records().await, vec![sample_posting("5")]);
        assert!(reader.is_closed());
    }

    #[tokio::test]
    async fn test_empty_board_publishes_nothing() {
        let mut reader = ScriptedPages::from_ids(&[&[]]);
        let store = MemoryStorage::new();
        let publisher = RecordingPublisher::new();

        let summary = orchestrator(150)
            .run(&mut reader, &store, &publisher)
            .await
            .unwrap();

        assert_eq!(summary.found, 0);
        assert!(publisher.batches().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_splits_into_batches() {
        let mut reader = ScriptedPages::from_ids(&[&["6", "5", "4", "3", "2", "1"]]);
        let store = MemoryStorage::with_checkpoint(sample_posting("2"));
        let publisher = RecordingPublisher::new();

        let summary = orchestrator(2)
            .run(&mut reader, &store, &publisher)
            .await
            .unwrap();

        let sizes: Vec<usize> = publisher.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.published, 5);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_checkpoint_untouched() {
        let mut reader = ScriptedPages::from_ids(&[&["3", "2", "1"]]);
        let store = MemoryStorage::with_checkpoint(sample_posting("1"));
        let publisher = RecordingPublisher::new().failing_batch(0);

        let summary = orchestrator(150)
            .run(&mut reader, &store, &publisher)
            .await
            .unwrap();

        assert_eq!(summary.failed, 3);
        assert_eq!(summary.published, 0);
        assert!(!summary.checkpoint_updated);
        assert_eq!(store.records().await, vec![sample_posting("1")]);
    }

    #[tokio::test]
    async fn test_later_batch_still_attempted_after_failure() {
        let mut reader = ScriptedPages::from_ids(&[&["5", "4", "3", "2", "1"]]);
        let store = MemoryStorage::with_checkpoint(sample_posting("1"));
        let publisher = RecordingPublisher::new().failing_batch(0);

        let summary = orchestrator(2)
            .run(&mut reader, &store, &publisher)
            .await
            .unwrap();

        assert_eq!(publisher.batches().len(), 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.published, 3);
        // The newest posting, not the first successful batch's head.
        assert_eq!(store.records().await, vec![sample_posting("5")]);
    }

    #[tokio::test]
    async fn test_checkpoint_replaced_once() {
        let mut reader = ScriptedPages::from_ids(&[&["5", "4", "3", "2", "1"]]);
        let store = MemoryStorage::with_checkpoint(sample_posting("1"));
        let publisher = RecordingPublisher::new();

        orchestrator(1)
            .run(&mut reader, &store, &publisher)
            .await
            .unwrap();

        assert_eq!(store.records().await, vec![sample_posting("5")]);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let mut reader = ScriptedPages::from_ids(&[&["3", "2", "1"]]);
        let store = MemoryStorage::with_checkpoint(sample_posting("1"));
        let publisher = RecordingPublisher::new();
        let orchestrator = Orchestrator::new(
            DiffTraversal::new(TEST_LINK_BASE),
            RunOptions::new(150, true),
        );

        let summary = orchestrator.run(&mut reader, &store, &publisher).await.unwrap();

        assert_eq!(ids(&summary.postings), ["3", "2", "1"]);
        assert_eq!(summary.batches, 0);
        assert!(publisher.batches().is_empty());
        assert_eq!(store.records().await, vec![sample_posting("1")]);
        assert!(reader.is_closed());
    }

    #[tokio::test]
    async fn test_reader_failure_closes_reader_and_publishes_nothing() {
        let mut reader = ScriptedPages::from_ids(&[&["3"], &["2"]]).failing_on_page(1);
        let store = MemoryStorage::with_checkpoint(sample_posting("1"));
        let publisher = RecordingPublisher::new();

        let result = orchestrator(150).run(&mut reader, &store, &publisher).await;

        assert!(matches!(result, Err(AppError::NavigationTimeout { .. })));
        assert!(reader.is_closed());
        assert!(publisher.batches().is_empty());
        assert_eq!(store.records().await, vec![sample_posting("1")]);
    }

    #[tokio::test]
    async fn test_store_read_failure_is_fatal() {
        let mut reader = ScriptedPages::from_ids(&[&["3"]]);
        let publisher = RecordingPublisher::new();

        let result = orchestrator(150)
            .run(&mut reader, &BrokenStore, &publisher)
            .await;

        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert!(reader.is_closed());
        assert_eq!(reader.rows_read, 0);
        assert!(publisher.batches().is_empty());
    }

    #[tokio::test]
    async fn test_scrape_returns_postings_without_publishing() {
        let mut reader = ScriptedPages::from_ids(&[&["3", "2"], &["1"]]);
        let store = MemoryStorage::with_checkpoint(sample_posting("1"));

        let postings = orchestrator(150).scrape(&mut reader, &store).await.unwrap();

        assert_eq!(ids(&postings), ["3", "2", "1"]);
        assert!(reader.is_closed());
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        assert_eq!(RunOptions::new(0, false).batch_size, 1);
    }
}
