//! Page worker: fetch, analyze, collect images, report, and extend the frontier

use crate::crawler::frontier::FrontierEntry;
use crate::crawler::parser::{parse_page, ParsedPage};
use crate::crawler::scheduler::CrawlContext;
use crate::crawler::types::{CrawlResult, ImageResult};
use crate::url::dedup_preserving_order;
use crate::FetchError;
use std::sync::Arc;
use url::Url;

/// Marks a page worker as finished when dropped
///
/// Created by `CrawlContext::begin_worker`; decrements the active count and
/// wakes the scheduler however the worker ends.
pub(crate) struct WorkerGuard {
    context: Arc<CrawlContext>,
}

impl WorkerGuard {
    pub(crate) fn new(context: Arc<CrawlContext>) -> Self {
        Self { context }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.context.worker_finished();
    }
}

/// Processes one page
///
/// 1. Fetches the page; on failure reports the error and ends
/// 2. Extracts link and image references
/// 3. Fetches the page's images through the image pool, if enabled
/// 4. Reports the page result
/// 5. Queues every same-host link one level deeper
pub(crate) async fn run_page_worker(
    context: Arc<CrawlContext>,
    entry: FrontierEntry,
    _guard: WorkerGuard,
) {
    let FrontierEntry { url, depth } = entry;
    let uri = url.to_string();

    let response = match context.fetcher.fetch(&url, &context.params).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", uri, e);
            context.sinks.dispatch(CrawlResult::failed(uri, depth, e)).await;
            return;
        }
    };

    let parsed = match parse_page(&response.body) {
        Ok(parsed) => parsed,
        Err(message) => {
            tracing::warn!("Failed to parse HTML for {}: {}", uri, message);
            let error = FetchError::HtmlParse {
                url: uri.clone(),
                message,
            };
            context.sinks.dispatch(CrawlResult::failed(uri, depth, error)).await;
            return;
        }
    };

    tracing::debug!(
        "Fetched {} (depth {}): {} links, {} images",
        uri,
        depth,
        parsed.links.len(),
        parsed.images.len()
    );

    let images = load_images(&context, &url, &parsed).await;

    context
        .sinks
        .dispatch(CrawlResult {
            uri,
            depth,
            outcome: Ok(response),
            images,
        })
        .await;

    queue_links(&context, &url, &parsed.links, depth + 1);
}

async fn load_images(context: &CrawlContext, page: &Url, parsed: &ParsedPage) -> Vec<ImageResult> {
    let Some(pool) = &context.images else {
        return Vec::new();
    };

    let candidates = parsed
        .images
        .iter()
        .filter_map(|src| match context.filter.resolve_image(src, page) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::trace!("Skipping image '{}' on {}: {}", src, page, e);
                None
            }
        })
        .collect();

    pool.fetch_all(dedup_preserving_order(candidates)).await
}

fn queue_links(context: &CrawlContext, page: &Url, links: &[String], depth: u32) {
    let mut queued = 0;

    for href in links {
        match context.filter.resolve_link(href, page) {
            Ok(url) => {
                if context.enqueue(url, depth) {
                    queued += 1;
                }
            }
            Err(e) => tracing::trace!("Skipping link '{}' on {}: {}", href, page, e),
        }
    }

    if queued > 0 {
        tracing::debug!("Queued {} new links from {} at depth {}", queued, page, depth);
    }
}
