//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod poll;

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the job ID from an info button's element ID.
///
/// The board renders IDs like `info_4429004`; anything not carrying
/// `prefix` followed by a non-empty remainder yields `None`.
pub fn extract_job_id(control_id: &str, prefix: &str) -> Option<String> {
    control_id
        .trim()
        .strip_prefix(prefix)
        .filter(|id| !id.is_empty() && !id.contains(char::is_whitespace))
        .map(str::to_string)
}
