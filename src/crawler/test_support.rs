//! In-memory fetcher used by the crawler unit tests

use crate::crawler::fetcher::{Fetcher, RequestParams};
use crate::crawler::types::FetchResponse;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

enum Scripted {
    Body(Vec<u8>),
    Status(u16),
}

/// Serves canned bodies by URL; unknown URLs answer 404
pub struct StaticFetcher {
    responses: HashMap<String, Scripted>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            delay: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.responses
            .insert(url.to_string(), Scripted::Body(html.as_bytes().to_vec()));
        self
    }

    pub fn bytes(mut self, url: &str, body: &[u8]) -> Self {
        self.responses
            .insert(url.to_string(), Scripted::Body(body.to_vec()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.responses
            .insert(url.to_string(), Scripted::Status(status));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches issued for a URL
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Total number of fetches issued
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Highest number of fetches that were in progress at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, uri: &Url, _params: &RequestParams) -> Result<FetchResponse, FetchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(uri.to_string())
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(uri.as_str()) {
            Some(Scripted::Body(body)) => Ok(FetchResponse {
                uri: uri.to_string(),
                status: 200,
                content_length: Some(body.len() as u64),
                headers: HeaderMap::new(),
                body: body.clone(),
            }),
            Some(Scripted::Status(status)) => Err(FetchError::Status {
                url: uri.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                url: uri.to_string(),
                status: 404,
            }),
        }
    }
}
