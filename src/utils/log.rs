// src/utils/log.rs

//! Structured console helpers on top of the `log` facade.
//!
//! Keeps run output consistent between the CLI (`env_logger`) and the
//! Lambda binary (`tracing-subscriber`), since both consume `log` records.

use crate::models::Posting;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log one posting as an indented, pipe-separated line
pub fn posting(posting: &Posting) {
    sub_item(&format!(
        "{} | {} | {} | closes {}",
        posting.job_id, posting.agency, posting.position, posting.closing_date
    ));
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
