// src/lambda/mod.rs

//! AWS Lambda handler for the job watcher.
//!
//! Each invocation performs one run:
//! 1. Loads configuration from `JOBWATCH_CONFIG` (or defaults)
//! 2. Reads the checkpoint from the configured store
//! 3. Scrapes the board and publishes new postings
//! 4. Reports counts back to the caller

use std::path::{Path, PathBuf};

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::{RunOptions, RunSummary};

/// Environment variable naming the config file.
pub const CONFIG_VAR: &str = "JOBWATCH_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "storage/config.toml";

/// Lambda invocation payload.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Traverse and report without publishing
    #[serde(default)]
    pub dry_run: bool,

    /// Override of `publisher.batch_size`
    pub batch_size: Option<usize>,
}

impl RunRequest {
    pub fn options(&self, config: &Config) -> RunOptions {
        RunOptions::new(
            self.batch_size.unwrap_or(config.publisher.batch_size),
            self.dry_run,
        )
    }
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct RunResponse {
    /// Whether the run completed
    pub success: bool,

    /// Postings selected for publishing
    pub found: usize,

    /// Postings in accepted batches
    pub published: usize,

    /// Postings in rejected batches
    pub failed: usize,

    /// Whether the checkpoint moved
    pub checkpoint_updated: bool,

    /// Error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl From<&RunSummary> for RunResponse {
    fn from(summary: &RunSummary) -> Self {
        Self {
            success: true,
            found: summary.found,
            published: summary.published,
            failed: summary.failed,
            checkpoint_updated: summary.checkpoint_updated,
            error: None,
            execution_time_ms: 0,
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<RunRequest>,
) -> std::result::Result<RunResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();

    info!(
        "Starting run: dry_run={}, batch_size={:?}",
        request.dry_run, request.batch_size
    );

    match run_job(&request).await {
        Ok(summary) => {
            let response = RunResponse {
                execution_time_ms: elapsed_ms(start),
                ..RunResponse::from(&summary)
            };
            info!(
                "Run completed: {} found, {} published, {} failed in {}ms",
                response.found, response.published, response.failed, response.execution_time_ms
            );
            Ok(response)
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Ok(RunResponse {
                success: false,
                error: Some(e.to_string()),
                execution_time_ms: elapsed_ms(start),
                ..Default::default()
            })
        }
    }
}

async fn run_job(request: &RunRequest) -> Result<RunSummary> {
    let config_path = config_path(std::env::var(CONFIG_VAR).ok());
    let config = load_lambda_config(&config_path)?;
    let storage_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    crate::pipeline::run_from_config(&config, &storage_dir, request.options(&config)).await
}

fn config_path(from_env: Option<String>) -> PathBuf {
    from_env
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration suitable for Lambda environment.
fn load_lambda_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)?
    } else {
        info!("No config at {}, using defaults", path.display());
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
