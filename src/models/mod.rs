// src/models/mod.rs

//! Domain models for the job watcher.

mod config;
mod posting;

// Re-export all public types
pub use config::{
    Config, Credentials, LoggingConfig, PublisherConfig, ScraperConfig, StoreBackend,
    StoreConfig, TraversalConfig,
};
pub use posting::{DESCRIPTIVE_CELLS, Posting, RawRow, job_link};
