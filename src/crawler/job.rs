//! Crawl job: the public handle that configures, starts, and stops a crawl

use crate::config::Config;
use crate::crawler::dispatch::ResultSinks;
use crate::crawler::fetcher::{Credentials, Fetcher, HttpFetcher, RequestParams, DEFAULT_USER_AGENT};
use crate::crawler::images::ImagePool;
use crate::crawler::scheduler::{run_scheduler, CrawlContext};
use crate::crawler::types::{CrawlProgress, CrawlResult};
use crate::url::{parse_origin, HostPolicy, LinkFilter, RelativeBase};
use crate::CrawlError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A same-host, depth-bounded crawl
///
/// Configure with the setters, then call [`Crawler::start`] from inside a
/// Tokio runtime. Results are delivered to the channel and/or callback as
/// pages complete. The result channel closes once the crawl has finished and
/// the `Crawler` is dropped.
///
/// # Example
///
/// ```no_run
/// use sumi_crawl::Crawler;
/// use tokio::sync::mpsc;
///
/// # async fn run() -> sumi_crawl::Result<()> {
/// let (tx, mut rx) = mpsc::channel(16);
///
/// let mut crawler = Crawler::new("https://example.com/", "", "");
/// crawler.set_max_depth(2);
/// crawler.set_max_workers(4);
/// crawler.set_callback_channel(tx);
/// crawler.start()?;
///
/// let printer = tokio::spawn(async move {
///     while let Some(result) = rx.recv().await {
///         println!("{} {}", result.depth, result.uri);
///     }
/// });
///
/// crawler.wait().await;
/// drop(crawler);
/// printer.await.ok();
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    origin: String,
    credentials: Option<Credentials>,
    headers: HashMap<String, String>,
    timeout: u64,
    max_depth: u32,
    max_workers: usize,
    load_images: bool,
    image_workers: usize,
    images_cross_host: bool,
    resolve_against_page: bool,
    user_agent: String,
    sinks: ResultSinks,
    fetcher: Option<Arc<dyn Fetcher>>,
    context: Option<Arc<CrawlContext>>,
}

impl Crawler {
    /// Creates a crawl of `origin`
    ///
    /// Basic auth is sent only when both `username` and `password` are
    /// non-empty. The origin is validated by [`Crawler::start`].
    pub fn new(origin: &str, username: &str, password: &str) -> Self {
        Self {
            origin: origin.to_string(),
            credentials: Credentials::from_parts(username, password),
            headers: HashMap::new(),
            timeout: 0,
            max_depth: 0,
            max_workers: 1,
            load_images: false,
            image_workers: 1,
            images_cross_host: true,
            resolve_against_page: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sinks: ResultSinks::new(),
            fetcher: None,
            context: None,
        }
    }

    /// Builds a crawl from a loaded configuration file
    pub fn from_config(config: &Config) -> Self {
        let (username, password) = config
            .auth
            .as_ref()
            .map(|auth| (auth.username.as_str(), auth.password.as_str()))
            .unwrap_or(("", ""));

        let mut crawler = Self::new(&config.crawler.seed, username, password);
        crawler.set_headers(config.headers.clone());
        crawler.set_timeout(config.crawler.timeout);
        crawler.set_max_depth(config.crawler.max_depth);
        crawler.set_max_workers(config.crawler.max_workers);
        crawler.set_load_images(config.images.enabled);
        crawler.set_image_workers(config.images.workers);
        crawler.set_images_cross_host(config.images.cross_host);
        crawler.set_resolve_against_page(config.crawler.resolve_against_page);
        if let Some(user_agent) = &config.crawler.user_agent {
            crawler.set_user_agent(user_agent.clone());
        }
        crawler
    }

    /// Extra headers sent with every request
    pub fn set_headers(&mut self, headers: HashMap<String, String>) {
        self.headers = headers;
    }

    /// Per-fetch timeout in seconds (0 = no timeout)
    pub fn set_timeout(&mut self, seconds: u64) {
        self.timeout = seconds;
    }

    /// Maximum hop count from the seed (0 = unlimited)
    pub fn set_max_depth(&mut self, depth: u32) {
        self.max_depth = depth;
    }

    /// Maximum number of concurrent page workers (at least 1)
    pub fn set_max_workers(&mut self, workers: usize) {
        self.max_workers = workers.max(1);
    }

    /// Fetches each page's images before reporting it
    pub fn set_load_images(&mut self, enabled: bool) {
        self.load_images = enabled;
    }

    /// Number of image workers (at least 1)
    pub fn set_image_workers(&mut self, workers: usize) {
        self.image_workers = workers.max(1);
    }

    /// Allows images hosted on other hosts than the origin
    pub fn set_images_cross_host(&mut self, allowed: bool) {
        self.images_cross_host = allowed;
    }

    /// Resolves relative links against the page instead of the origin root
    pub fn set_resolve_against_page(&mut self, enabled: bool) {
        self.resolve_against_page = enabled;
    }

    pub fn set_user_agent(&mut self, user_agent: String) {
        self.user_agent = user_agent;
    }

    /// Sends every result on `channel`
    pub fn set_callback_channel(&mut self, channel: mpsc::Sender<CrawlResult>) {
        self.sinks.set_channel(channel);
    }

    /// Invokes `callback` for every result
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: Fn(&CrawlResult) + Send + Sync + 'static,
    {
        self.sinks.set_callback(Arc::new(callback));
    }

    /// Replaces the HTTP fetcher
    pub fn set_fetcher(&mut self, fetcher: Arc<dyn Fetcher>) {
        self.fetcher = Some(fetcher);
    }

    /// Starts the crawl in the background
    ///
    /// Must be called from within a Tokio runtime. All crawl state is
    /// re-initialized; a crawl still running from an earlier call is
    /// stopped first.
    ///
    /// # Errors
    ///
    /// * `CrawlError::InvalidOrigin` - the origin is not an absolute http(s) URL
    /// * `CrawlError::InvalidHeader` - a configured header cannot be sent
    /// * `CrawlError::Client` - the HTTP client could not be built
    pub fn start(&mut self) -> Result<(), CrawlError> {
        let origin = parse_origin(&self.origin).map_err(|e| CrawlError::InvalidOrigin {
            uri: self.origin.clone(),
            reason: e.to_string(),
        })?;

        let relative_base = if self.resolve_against_page {
            RelativeBase::Page
        } else {
            RelativeBase::Origin
        };
        let image_policy = if self.images_cross_host {
            HostPolicy::AnyHost
        } else {
            HostPolicy::SameHost
        };
        let filter = LinkFilter::new(origin.clone())
            .map_err(|e| CrawlError::InvalidOrigin {
                uri: self.origin.clone(),
                reason: e.to_string(),
            })?
            .with_relative_base(relative_base)
            .with_image_policy(image_policy);

        let params = Arc::new(RequestParams {
            credentials: self.credentials.clone(),
            headers: build_header_map(&self.headers)?,
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
        });

        let fetcher: Arc<dyn Fetcher> = match &self.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => Arc::new(HttpFetcher::new(&self.user_agent)?),
        };

        if let Some(previous) = self.context.take() {
            if previous.is_processing() {
                tracing::warn!("Crawler restarted while running; stopping the previous crawl");
                previous.request_stop();
            }
        }

        let images = self
            .load_images
            .then(|| ImagePool::spawn(self.image_workers, fetcher.clone(), params.clone()));

        let context = Arc::new(CrawlContext::new(
            filter,
            fetcher,
            params,
            images,
            self.sinks.clone(),
            self.max_workers,
            self.max_depth,
        ));

        if self.sinks.is_empty() {
            tracing::debug!("No result sink configured; results will be dropped");
        }

        context.enqueue(origin, 0);
        tokio::spawn(run_scheduler(context.clone()));
        self.context = Some(context);

        Ok(())
    }

    /// Stops scheduling new pages
    ///
    /// In-flight page workers finish their current page; queued pages are
    /// discarded. [`Crawler::is_processing`] turns false once they are done.
    pub fn stop(&self) {
        if let Some(context) = &self.context {
            tracing::info!("Stop requested");
            context.request_stop();
        }
    }

    /// Returns true while the crawl is running
    pub fn is_processing(&self) -> bool {
        self.context
            .as_ref()
            .map_or(false, |context| context.is_processing())
    }

    /// Waits until the crawl has finished or has been stopped and drained
    ///
    /// Returns immediately if the crawl was never started.
    pub async fn wait(&self) {
        if let Some(context) = &self.context {
            context.finished().await;
        }
    }

    /// Snapshot of the crawl's progress
    pub fn progress(&self) -> CrawlProgress {
        self.context
            .as_ref()
            .map(|context| context.progress())
            .unwrap_or_default()
    }
}

/// Converts configured headers into a request header map
pub fn build_header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, CrawlError> {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| CrawlError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| CrawlError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }

    Ok(map)
}
