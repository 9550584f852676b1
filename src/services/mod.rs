//! Service layer for the job watcher.
//!
//! This module contains the collaborators the pipeline drives:
//! - Job table access (`PageReader`, `ChromeTableReader`)
//! - Job table parsing (`TableParser`)
//! - Feed publishing (`Publisher`, `FacebookPublisher`)

#[cfg(feature = "browser")]
mod browser;
mod page_reader;
mod publisher;
pub mod table;

#[cfg(feature = "browser")]
pub use browser::ChromeTableReader;
pub use page_reader::PageReader;
pub use publisher::{DigestFormatter, FacebookPublisher, PublishReceipt, Publisher};
pub use table::{TableParser, TableSelectors};
