// src/error.rs

//! Unified error handling for the job watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for job watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Missing credential or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Browser launch or DevTools protocol failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// An expected page element or row count never appeared
    #[error("Timed out after {waited_ms}ms waiting for {target}")]
    NavigationTimeout { target: String, waited_ms: u64 },

    /// Publishing a batch to the feed failed
    #[error("Publish error{}: {message}", status_suffix(.status))]
    Publish {
        status: Option<u16>,
        message: String,
    },

    /// Checkpoint store read/write failed
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a browser error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Create a navigation timeout error.
    pub fn navigation_timeout(target: impl Into<String>, waited_ms: u64) -> Self {
        Self::NavigationTimeout {
            target: target.into(),
            waited_ms,
        }
    }

    /// Create a publish error.
    pub fn publish(status: Option<u16>, message: impl fmt::Display) -> Self {
        Self::Publish {
            status,
            message: message.to_string(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Whether the run must stop when this error is raised.
    ///
    /// Only per-batch publish failures are recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Publish { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::persistence(e)
    }
}

#[cfg(feature = "browser")]
impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        Self::browser(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_includes_status() {
        let err = AppError::publish(Some(500), "Internal Server Error");
        assert_eq!(
            err.to_string(),
            "Publish error (HTTP 500): Internal Server Error"
        );

        let err = AppError::publish(None, "connection refused");
        assert_eq!(err.to_string(), "Publish error: connection refused");
    }

    #[test]
    fn test_only_publish_errors_are_recoverable() {
        assert!(!AppError::publish(Some(400), "bad").is_fatal());
        assert!(AppError::navigation_timeout("table#jobs", 5000).is_fatal());
        assert!(AppError::config("FB_ACCESSTOKEN is not set").is_fatal());
        assert!(AppError::persistence("disk full").is_fatal());
    }

    #[test]
    fn test_navigation_timeout_message() {
        let err = AppError::navigation_timeout("select[name=\"region\"]", 1500);
        assert_eq!(
            err.to_string(),
            "Timed out after 1500ms waiting for select[name=\"region\"]"
        );
    }
}
