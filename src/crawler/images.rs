//! Image sub-pool
//!
//! A fixed set of long-lived workers fetch the images referenced by pages.
//! Page workers fan their image requests out across the pool and wait until
//! every image has been answered before reporting the page.
//!
//! Image dedup keeps "seen before, nothing new to report" semantics: a URL
//! that was fetched successfully for one page is answered with
//! [`ImageOutcome::AlreadyLoaded`] for every later page, and the payload is
//! not replayed. A request for a URL another worker is still fetching waits
//! for that fetch to finish. It is then answered `AlreadyLoaded` if the fetch
//! succeeded, or fetches the image itself if it failed.

use crate::crawler::fetcher::{Fetcher, RequestParams};
use crate::crawler::types::{ImageOutcome, ImageResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use url::Url;

/// One image fetch request and where to answer it
#[derive(Debug)]
pub struct ImageRequest {
    pub uri: Url,
    pub reply: mpsc::UnboundedSender<ImageResult>,
}

/// What a worker should do with an image URL
#[derive(Debug)]
pub enum Reservation {
    /// The caller now owns the fetch and must call [`ImageStore::complete`]
    Fetch,
    /// The URL was fetched successfully before
    Loaded,
    /// Another worker is fetching the URL; flips to true when it finishes
    Wait(watch::Receiver<bool>),
}

/// Image URLs fetched, and claims on those still being fetched
#[derive(Debug, Default)]
pub struct ImageStore {
    loaded: HashSet<String>,
    in_flight: HashMap<String, watch::Sender<bool>>,
}

impl ImageStore {
    /// Claims a URL for fetching unless it is loaded or claimed elsewhere
    pub fn reserve(&mut self, uri: &str) -> Reservation {
        if self.loaded.contains(uri) {
            return Reservation::Loaded;
        }
        if let Some(done) = self.in_flight.get(uri) {
            return Reservation::Wait(done.subscribe());
        }
        let (done, _) = watch::channel(false);
        self.in_flight.insert(uri.to_string(), done);
        Reservation::Fetch
    }

    /// Releases a claim, recording the URL as loaded on success
    ///
    /// Every request waiting on the claim is woken.
    pub fn complete(&mut self, uri: &str, success: bool) {
        if success {
            self.loaded.insert(uri.to_string());
        }
        if let Some(done) = self.in_flight.remove(uri) {
            done.send_replace(true);
        }
    }

    /// Returns true if the URL was fetched successfully
    pub fn is_loaded(&self, uri: &str) -> bool {
        self.loaded.contains(uri)
    }

    /// Number of images fetched successfully
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}

/// State shared by every image worker
struct ImageWorkerContext {
    fetcher: Arc<dyn Fetcher>,
    params: Arc<RequestParams>,
    store: Arc<Mutex<ImageStore>>,
}

/// Handle to the running image workers
pub struct ImagePool {
    senders: Vec<mpsc::UnboundedSender<ImageRequest>>,
    stop: watch::Sender<bool>,
    store: Arc<Mutex<ImageStore>>,
}

impl ImagePool {
    /// Spawns `workers` image workers (at least one) on the current runtime
    pub fn spawn(workers: usize, fetcher: Arc<dyn Fetcher>, params: Arc<RequestParams>) -> Self {
        let workers = workers.max(1);
        let store = Arc::new(Mutex::new(ImageStore::default()));
        let (stop, _) = watch::channel(false);

        let context = Arc::new(ImageWorkerContext {
            fetcher,
            params,
            store: store.clone(),
        });

        let senders = (0..workers)
            .map(|id| {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(run_image_worker(id, rx, stop.subscribe(), context.clone()));
                tx
            })
            .collect();

        tracing::debug!("Started {} image workers", workers);

        Self {
            senders,
            stop,
            store,
        }
    }

    /// Number of workers in the pool
    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Number of images fetched successfully so far
    pub fn loaded_count(&self) -> usize {
        lock_store(&self.store).loaded_count()
    }

    /// Fetches every URL through the pool and waits for all answers
    ///
    /// Requests are spread round-robin starting at worker 0. Exactly one
    /// result is returned per URL, in arrival order. URLs whose request was
    /// dropped because the pool stopped are answered with
    /// `FetchError::ImagePoolStopped`.
    pub async fn fetch_all(&self, uris: Vec<Url>) -> Vec<ImageResult> {
        let expected = uris.len();
        if expected == 0 {
            return Vec::new();
        }

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();

        for (index, uri) in uris.iter().enumerate() {
            let worker = &self.senders[index % self.senders.len()];
            let request = ImageRequest {
                uri: uri.clone(),
                reply: reply_tx.clone(),
            };

            if let Err(rejected) = worker.send(request) {
                let _ = reply_tx.send(ImageResult::abandoned(rejected.0.uri.to_string()));
            }
        }
        drop(reply_tx);

        let mut results = Vec::with_capacity(expected);
        while results.len() < expected {
            match reply_rx.recv().await {
                Some(result) => results.push(result),
                None => break,
            }
        }

        if results.len() < expected {
            let answered: HashSet<String> = results.iter().map(|r| r.uri.clone()).collect();
            for uri in uris {
                if !answered.contains(uri.as_str()) {
                    results.push(ImageResult::abandoned(uri.to_string()));
                }
            }
        }

        results
    }

    /// Signals every worker to exit
    ///
    /// Requests still queued are dropped; their callers receive
    /// `ImagePoolStopped` results.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

fn lock_store(store: &Mutex<ImageStore>) -> std::sync::MutexGuard<'_, ImageStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_image_worker(
    id: usize,
    mut requests: mpsc::UnboundedReceiver<ImageRequest>,
    mut stop: watch::Receiver<bool>,
    context: Arc<ImageWorkerContext>,
) {
    loop {
        tokio::select! {
            biased;
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            request = requests.recv() => match request {
                Some(request) => handle_request(&context, request).await,
                None => break,
            },
        }
    }

    tracing::trace!("Image worker {} exiting", id);
}

/// Releases a fetch claim when dropped, failed unless marked otherwise
struct Claim<'a> {
    store: &'a Mutex<ImageStore>,
    uri: &'a str,
    success: bool,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        lock_store(self.store).complete(self.uri, self.success);
    }
}

async fn handle_request(context: &ImageWorkerContext, request: ImageRequest) {
    let ImageRequest { uri, reply } = request;
    let key = uri.as_str().to_string();

    let outcome = loop {
        let reservation = lock_store(&context.store).reserve(&key);
        match reservation {
            Reservation::Loaded => {
                tracing::trace!("Image already loaded: {}", key);
                break ImageOutcome::AlreadyLoaded;
            }
            Reservation::Wait(mut done) => {
                tracing::trace!("Image in flight, waiting: {}", key);
                // A closed channel also means the claim is gone
                let _ = done.wait_for(|finished| *finished).await;
            }
            Reservation::Fetch => {
                let mut claim = Claim {
                    store: &context.store,
                    uri: &key,
                    success: false,
                };
                let fetched = context.fetcher.fetch(&uri, &context.params).await;
                match &fetched {
                    Ok(_) => claim.success = true,
                    Err(e) => tracing::debug!("Image fetch failed: {}", e),
                }
                drop(claim);
                break ImageOutcome::Fetched(fetched);
            }
        }
    };

    // The page worker may have given up on a stopped crawl
    let _ = reply.send(ImageResult { uri: key, outcome });
}
