//! Pipeline entry points.
//!
//! - `DiffTraversal`: walk the job table down to the stored checkpoint
//! - `Orchestrator`: one checkpoint → traverse → publish → update run
//! - `run_scraper` / `scrape_board`: the same against a live browser
//! - `run_from_config`: credentials, store and publisher wired from config

pub mod run;
pub mod traverse;

#[cfg(feature = "browser")]
pub use run::{run_from_config, run_scraper, scrape_board};
pub use run::{Orchestrator, RunOptions, RunSummary};
pub use traverse::{DiffTraversal, is_unchanged};
