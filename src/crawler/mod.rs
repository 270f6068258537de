//! Crawler module: the crawl engine and its collaborators
//!
//! This module contains the core crawling logic, including:
//! - The public crawl handle and its lifecycle
//! - The frontier and page dedup store
//! - The scheduler loop and bounded page worker pool
//! - The image sub-pool
//! - Result dispatch to channels and callbacks
//! - HTTP fetching and HTML reference extraction

mod dispatch;
mod fetcher;
mod frontier;
mod images;
mod job;
mod parser;
mod scheduler;
mod types;
mod worker;

#[cfg(test)]
mod test_support;

pub use dispatch::{ResultCallback, ResultSinks};
pub use fetcher::{
    build_http_client, Credentials, Fetcher, HttpFetcher, RequestParams, DEFAULT_USER_AGENT,
};
pub use frontier::{Frontier, FrontierEntry};
pub use images::{ImagePool, ImageRequest, ImageStore, Reservation};
pub use job::{build_header_map, Crawler};
pub use parser::{extract_references, parse_page, ParsedPage, Reference};
pub use types::{CrawlProgress, CrawlResult, FetchResponse, ImageOutcome, ImageResult};
