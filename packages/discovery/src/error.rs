//! Typed errors for discovery operations.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on failure kinds.

use thiserror::Error;

/// Errors that can occur while fetching or crawling.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Connection timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Browser session could not be started or driven
    #[error("browser error: {0}")]
    Browser(String),
}

/// Result type alias for crawl operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
