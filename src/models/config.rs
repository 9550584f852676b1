//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::utils::poll::PollPolicy;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Career site and browser behavior
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Diff traversal limits
    #[serde(default)]
    pub traversal: TraversalConfig,

    /// Feed publishing settings
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Checkpoint store selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::config("scraper.user_agent is empty"));
        }
        Url::parse(&self.scraper.career_url)
            .map_err(|e| AppError::config(format!("scraper.career_url: {e}")))?;
        Url::parse(&self.scraper.job_link_base)
            .map_err(|e| AppError::config(format!("scraper.job_link_base: {e}")))?;
        if self.scraper.control_id_prefix.is_empty() {
            return Err(AppError::config("scraper.control_id_prefix is empty"));
        }
        if self.scraper.page_size == 0 {
            return Err(AppError::config("scraper.page_size must be > 0"));
        }
        if self.scraper.poll_interval_ms == 0 {
            return Err(AppError::config("scraper.poll_interval_ms must be > 0"));
        }
        if self.scraper.poll_max_attempts == 0 {
            return Err(AppError::config("scraper.poll_max_attempts must be > 0"));
        }
        if self.traversal.max_pages == Some(0) {
            return Err(AppError::config("traversal.max_pages must be > 0 when set"));
        }
        Url::parse(&self.publisher.graph_base_url)
            .map_err(|e| AppError::config(format!("publisher.graph_base_url: {e}")))?;
        if self.publisher.batch_size == 0 {
            return Err(AppError::config("publisher.batch_size must be > 0"));
        }
        if self.publisher.item_template.trim().is_empty() {
            return Err(AppError::config("publisher.item_template is empty"));
        }
        Ok(())
    }
}

/// Career site and browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Career board landing page
    #[serde(default = "defaults::career_url")]
    pub career_url: String,

    /// Region label picked in the region filter
    #[serde(default = "defaults::region")]
    pub region: String,

    /// User-Agent reported by the browser
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Run Chromium without a window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Rows per table page (largest option the board offers)
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Prefix joined with a job ID to form its detail link
    #[serde(default = "defaults::job_link_base")]
    pub job_link_base: String,

    /// Prefix of the per-row info button's element ID
    #[serde(default = "defaults::control_id_prefix")]
    pub control_id_prefix: String,

    /// Delay between polls while waiting for the table
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    /// Polls before giving up with a navigation timeout
    #[serde(default = "defaults::poll_max_attempts")]
    pub poll_max_attempts: u32,

    /// Settle delay after changing the page size
    #[serde(default = "defaults::page_size_settle")]
    pub page_size_settle_ms: u64,

    /// Settle delay after clicking the next-page control
    #[serde(default = "defaults::next_page_settle")]
    pub next_page_settle_ms: u64,
}

impl ScraperConfig {
    /// Polling policy for asynchronous table loads.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.poll_max_attempts,
        )
    }

    pub fn page_size_settle(&self) -> Duration {
        Duration::from_millis(self.page_size_settle_ms)
    }

    pub fn next_page_settle(&self) -> Duration {
        Duration::from_millis(self.next_page_settle_ms)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            career_url: defaults::career_url(),
            region: defaults::region(),
            user_agent: defaults::user_agent(),
            headless: defaults::headless(),
            page_size: defaults::page_size(),
            job_link_base: defaults::job_link_base(),
            control_id_prefix: defaults::control_id_prefix(),
            poll_interval_ms: defaults::poll_interval(),
            poll_max_attempts: defaults::poll_max_attempts(),
            page_size_settle_ms: defaults::page_size_settle(),
            next_page_settle_ms: defaults::next_page_settle(),
        }
    }
}

/// Diff traversal limits.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraversalConfig {
    /// Stop after this many pages even if the checkpoint was not seen
    #[serde(default)]
    pub max_pages: Option<usize>,
}

/// Feed publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Graph API host
    #[serde(default = "defaults::graph_base_url")]
    pub graph_base_url: String,

    /// Graph API version segment
    #[serde(default = "defaults::api_version")]
    pub api_version: String,

    /// Postings per published message
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "defaults::publish_timeout")]
    pub timeout_secs: u64,

    /// Template rendered once per posting
    #[serde(default = "defaults::item_template")]
    pub item_template: String,

    /// Text placed between rendered postings
    #[serde(default = "defaults::separator")]
    pub separator: String,
}

impl PublisherConfig {
    /// Feed endpoint for a page.
    pub fn feed_url(&self, page_id: &str) -> String {
        format!(
            "{}/{}/{}/feed",
            self.graph_base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/'),
            page_id
        )
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            graph_base_url: defaults::graph_base_url(),
            api_version: defaults::api_version(),
            batch_size: defaults::batch_size(),
            timeout_secs: defaults::publish_timeout(),
            item_template: defaults::item_template(),
            separator: defaults::separator(),
        }
    }
}

/// Checkpoint store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
    S3,
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Json => "json",
            StoreBackend::S3 => "s3",
            StoreBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// Checkpoint store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite database file, relative to the storage directory
    #[serde(default = "defaults::sqlite_path")]
    pub sqlite_path: String,

    /// JSON checkpoint file, relative to the storage directory
    #[serde(default = "defaults::json_path")]
    pub json_path: String,

    /// Bucket for the S3 backend
    #[serde(default = "defaults::s3_bucket")]
    pub s3_bucket: String,

    /// Object key for the S3 backend
    #[serde(default = "defaults::s3_key")]
    pub s3_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: defaults::sqlite_path(),
            json_path: defaults::json_path(),
            s3_bucket: defaults::s3_bucket(),
            s3_key: defaults::s3_key(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Publishing credentials, read from the environment.
#[derive(Debug)]
pub struct Credentials {
    /// Page access token
    pub access_token: SecretString,

    /// Target page ID
    pub page_id: String,
}

impl Credentials {
    pub const ACCESS_TOKEN_VAR: &'static str = "FB_ACCESSTOKEN";
    pub const PAGE_ID_VAR: &'static str = "PAGE_ID";

    /// Read credentials from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::config(format!("{key} must be set")))
        };

        Ok(Self {
            access_token: SecretString::from(require(Self::ACCESS_TOKEN_VAR)?),
            page_id: require(Self::PAGE_ID_VAR)?,
        })
    }
}

mod defaults {
    // Scraper defaults
    pub fn career_url() -> String {
        "https://csc.gov.ph/career/".into()
    }
    pub fn region() -> String {
        "NCR".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36".into()
    }
    pub fn headless() -> bool {
        true
    }
    pub fn page_size() -> usize {
        100
    }
    pub fn job_link_base() -> String {
        "https://csc.gov.ph/career/job/".into()
    }
    pub fn control_id_prefix() -> String {
        "info_".into()
    }
    pub fn poll_interval() -> u64 {
        500
    }
    pub fn poll_max_attempts() -> u32 {
        60
    }
    pub fn page_size_settle() -> u64 {
        2000
    }
    pub fn next_page_settle() -> u64 {
        1000
    }

    // Publisher defaults
    pub fn graph_base_url() -> String {
        "https://graph.facebook.com".into()
    }
    pub fn api_version() -> String {
        "v22.0".into()
    }
    pub fn batch_size() -> usize {
        150
    }
    pub fn publish_timeout() -> u64 {
        30
    }
    pub fn item_template() -> String {
        "{index}. {agency} is hiring!\n\
         Position: {position}\n\
         Region: {region}\n\
         Posting date: {posting_date}\n\
         Closing date: {closing_date}\n\
         Link: {job_link}"
            .into()
    }
    pub fn separator() -> String {
        "\n-----------------------\n".into()
    }

    // Store defaults
    pub fn sqlite_path() -> String {
        "cscjobs.db".into()
    }
    pub fn json_path() -> String {
        "checkpoint.json".into()
    }
    pub fn s3_bucket() -> String {
        "jobwatch".into()
    }
    pub fn s3_key() -> String {
        "jobwatch/checkpoint.json".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
