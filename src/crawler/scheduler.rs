//! Scheduler loop and page worker pool
//!
//! This module handles:
//! - The shared state of one running crawl
//! - Bounded concurrency: at most `max_workers` page workers at a time
//! - Moving frontier entries into page workers
//! - Detecting completion (empty frontier and no running workers)
//! - Honoring stop requests
//!
//! The loop is event driven: it sleeps on a `Notify` that is signaled when
//! an entry is queued, when a worker finishes, and when a stop is requested.

use crate::crawler::dispatch::ResultSinks;
use crate::crawler::fetcher::{Fetcher, RequestParams};
use crate::crawler::frontier::Frontier;
use crate::crawler::images::ImagePool;
use crate::crawler::types::CrawlProgress;
use crate::crawler::worker::{run_page_worker, WorkerGuard};
use crate::url::LinkFilter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::{watch, Notify};
use url::Url;

/// Shared state of one running crawl
///
/// Owned by the crawler job and shared with the scheduler loop and every
/// page worker. All mutation goes through the methods below.
pub(crate) struct CrawlContext {
    pub(crate) filter: LinkFilter,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) params: Arc<RequestParams>,
    pub(crate) images: Option<ImagePool>,
    pub(crate) sinks: ResultSinks,
    max_workers: usize,
    frontier: Mutex<Frontier>,
    active: AtomicUsize,
    processing: AtomicBool,
    stop_requested: AtomicBool,
    wake: Notify,
    finished: watch::Sender<bool>,
}

impl CrawlContext {
    pub(crate) fn new(
        filter: LinkFilter,
        fetcher: Arc<dyn Fetcher>,
        params: Arc<RequestParams>,
        images: Option<ImagePool>,
        sinks: ResultSinks,
        max_workers: usize,
        max_depth: u32,
    ) -> Self {
        Self {
            filter,
            fetcher,
            params,
            images,
            sinks,
            max_workers: max_workers.max(1),
            frontier: Mutex::new(Frontier::new(max_depth)),
            active: AtomicUsize::new(0),
            processing: AtomicBool::new(true),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
            finished: watch::channel(false).0,
        }
    }

    fn lock_frontier(&self) -> MutexGuard<'_, Frontier> {
        self.frontier.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a URL at the given depth and wakes the scheduler if it was added
    pub(crate) fn enqueue(&self, url: Url, depth: u32) -> bool {
        if self.is_stop_requested() {
            return false;
        }

        let added = self.lock_frontier().enqueue(url, depth);
        if added {
            self.wake.notify_one();
        }
        added
    }

    /// Counts a new page worker; the returned guard uncounts it on drop
    pub(crate) fn begin_worker(self: &Arc<Self>) -> WorkerGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        WorkerGuard::new(self.clone())
    }

    /// Called by a worker guard when its page worker ends
    pub(crate) fn worker_finished(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Stops scheduling new work and shuts the image pool down
    pub(crate) fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(images) = &self.images {
            images.stop();
        }
        self.wake.notify_one();
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Resolves once the scheduler loop has exited
    pub(crate) async fn finished(&self) {
        let mut finished = self.finished.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = finished.wait_for(|done| *done).await;
    }

    pub(crate) fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn progress(&self) -> CrawlProgress {
        let frontier = self.lock_frontier();
        CrawlProgress {
            queued: frontier.len(),
            loaded: frontier.loaded_count(),
            active_workers: self.active_workers(),
            current_depth: frontier.current_depth(),
            images_loaded: self
                .images
                .as_ref()
                .map_or(0, |images| images.loaded_count()),
        }
    }

    /// One scheduling pass; returns true once the crawl is finished
    ///
    /// Runs entirely under the frontier lock.
    fn schedule(self: &Arc<Self>) -> bool {
        let mut frontier = self.lock_frontier();

        if self.is_stop_requested() {
            let discarded = frontier.clear();
            if discarded > 0 {
                tracing::debug!("Stop requested, discarded {} queued URLs", discarded);
            }
        } else {
            let capacity = self.max_workers.saturating_sub(self.active_workers());
            for entry in frontier.take_ready(capacity) {
                let guard = self.begin_worker();
                tracing::debug!("Dispatching {} (depth {})", entry.url, entry.depth);
                tokio::spawn(run_page_worker(self.clone(), entry, guard));
            }
        }

        if frontier.is_empty() && self.active_workers() == 0 {
            self.processing.store(false, Ordering::SeqCst);
            return true;
        }

        false
    }
}

/// Runs the scheduler loop until the crawl finishes or is stopped
pub(crate) async fn run_scheduler(context: Arc<CrawlContext>) {
    let start_time = Instant::now();
    tracing::info!("Starting crawl of {}", context.filter.origin());

    loop {
        if context.schedule() {
            break;
        }
        context.wake.notified().await;
    }

    if let Some(images) = &context.images {
        images.stop();
    }

    let progress = context.progress();
    context.finished.send_replace(true);

    if context.is_stop_requested() {
        tracing::info!(
            "Crawl stopped: {} pages dispatched in {:?}",
            progress.loaded,
            start_time.elapsed()
        );
    } else {
        tracing::info!(
            "Crawl completed: {} pages dispatched in {:?}",
            progress.loaded,
            start_time.elapsed()
        );
    }
}
