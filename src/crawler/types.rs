//! Values handed to the caller for every crawled page

use crate::FetchError;
use reqwest::header::{HeaderMap, CONTENT_TYPE};

/// A successful fetch: HTTP 200 with the (decoded) body
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL that was requested
    pub uri: String,

    /// HTTP status code (always 200 for a successful fetch)
    pub status: u16,

    /// Content-Length reported by the server, if any
    pub content_length: Option<u64>,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body, after content-encoding was decoded
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Content-Type header value, if present and valid UTF-8
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Result reported once per page worker
#[derive(Debug)]
pub struct CrawlResult {
    /// The page URL
    pub uri: String,

    /// Hop count from the seed along the path that first discovered the page
    pub depth: u32,

    /// The fetched page, or why it could not be fetched or parsed
    pub outcome: Result<FetchResponse, FetchError>,

    /// One entry per distinct image referenced by the page (empty unless
    /// image loading is enabled and the page was fetched and parsed)
    pub images: Vec<ImageResult>,
}

impl CrawlResult {
    /// Creates a result for a page that failed before images were considered
    pub fn failed(uri: String, depth: u32, error: FetchError) -> Self {
        Self {
            uri,
            depth,
            outcome: Err(error),
            images: Vec::new(),
        }
    }

    /// Returns true if the page itself was fetched and parsed
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The fetched page, if any
    pub fn response(&self) -> Option<&FetchResponse> {
        self.outcome.as_ref().ok()
    }

    /// The page error, if any
    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }
}

/// Result for one image referenced by a page
#[derive(Debug)]
pub struct ImageResult {
    /// The image URL
    pub uri: String,

    /// What happened when the image was requested
    pub outcome: ImageOutcome,
}

impl ImageResult {
    /// Builds the result for an image whose request never reached a worker
    pub fn abandoned(uri: String) -> Self {
        let error = FetchError::ImagePoolStopped { url: uri.clone() };
        Self {
            uri,
            outcome: ImageOutcome::Fetched(Err(error)),
        }
    }
}

/// Outcome of an image request
#[derive(Debug)]
pub enum ImageOutcome {
    /// The image was fetched for this page (successfully or not)
    Fetched(Result<FetchResponse, FetchError>),

    /// The image was already fetched successfully for another page.
    /// The first fetch's payload is not replayed.
    AlreadyLoaded,
}

impl ImageOutcome {
    /// Returns true for a fresh, successful fetch
    pub fn is_fetched_ok(&self) -> bool {
        matches!(self, Self::Fetched(Ok(_)))
    }
}

/// Point-in-time view of a running crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlProgress {
    /// Entries waiting in the frontier
    pub queued: usize,

    /// URLs already dispatched to a page worker
    pub loaded: usize,

    /// Page workers currently running
    pub active_workers: usize,

    /// Depth of the most recently queued entry (coarse progress indicator)
    pub current_depth: u32,

    /// Images fetched successfully so far
    pub images_loaded: usize,
}
