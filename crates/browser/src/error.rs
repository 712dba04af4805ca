//! Browser error types.

use thiserror::Error;

/// Errors that can occur while loading a page.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}
