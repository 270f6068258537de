//! HTTP fetcher implementation
//!
//! This module defines the fetch collaborator the crawl engine calls for
//! every page and image, and its reqwest-backed implementation:
//! - Building the HTTP client with the crawler's user agent
//! - Basic auth, extra headers, and per-request timeouts
//! - Transparent gzip/brotli decoding
//! - Error classification

use crate::crawler::types::FetchResponse;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("sumi-crawl/", env!("CARGO_PKG_VERSION"));

/// HTTP basic auth credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Returns credentials only when both parts are non-empty
    pub fn from_parts(username: &str, password: &str) -> Option<Self> {
        if username.is_empty() || password.is_empty() {
            return None;
        }

        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Per-crawl request settings applied to every fetch
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    pub credentials: Option<Credentials>,
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

/// Fetches one URL
///
/// Implementations must fail on any status other than 200 and return the
/// decoded body on success.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, uri: &Url, params: &RequestParams) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sumi_crawl::crawler::build_http_client;
///
/// let client = build_http_client("sumi-crawl/0.1").unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with its own client
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(user_agent)?))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a URL with a single GET
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 200 | `Ok(FetchResponse)` |
    /// | Any other status | `FetchError::Status` |
    /// | Timeout (send or body) | `FetchError::Timeout` |
    /// | Connection failure | `FetchError::Connect` |
    /// | Body or decoding failure | `FetchError::Body` |
    async fn fetch(&self, uri: &Url, params: &RequestParams) -> Result<FetchResponse, FetchError> {
        let mut request = self.client.get(uri.clone()).headers(params.headers.clone());

        if let Some(credentials) = &params.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        if let Some(timeout) = params.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_error(uri, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length();
        let headers = response.headers().clone();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: uri.to_string(),
                }
            } else {
                FetchError::Body {
                    url: uri.to_string(),
                    source: e,
                }
            }
        })?;

        Ok(FetchResponse {
            uri: uri.to_string(),
            status: status.as_u16(),
            content_length,
            headers,
            body: body.to_vec(),
        })
    }
}

/// Maps a transport error onto the fetch error taxonomy
fn classify_error(uri: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: uri.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: uri.to_string(),
        }
    } else {
        FetchError::Http {
            url: uri.to_string(),
            source: error,
        }
    }
}
