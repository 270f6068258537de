//! Sumi-Crawl: a same-host, depth-bounded crawl engine
//!
//! This crate walks every page reachable from a seed URL on the seed's own
//! host, fetching pages with a bounded pool of workers and (optionally) the
//! images they embed, and hands each fetched page to the caller through a
//! channel and/or a callback.

pub mod config;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Fatal errors: the crawl cannot start
///
/// Configuration files fail earlier, with [`ConfigError`].
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid origin URL '{uri}': {reason}")]
    InvalidOrigin { uri: String, reason: String },

    #[error("Invalid request header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors attached to a single page or image result
///
/// None of these abort the crawl; they are recorded on the result for the
/// URL that failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}")]
    Connect { url: String },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Image pool stopped before {url} was fetched")]
    ImagePoolStopped { url: String },
}

impl FetchError {
    /// HTTP status code carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Reasons a discovered reference is not followed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Host {found} differs from origin host {origin}")]
    ForeignHost { origin: String, found: String },

    #[error("Empty reference")]
    Empty,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, Crawler, FetchResponse, ImageOutcome, ImageResult};
pub use crate::url::LinkFilter;
