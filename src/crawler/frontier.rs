//! Frontier and page dedup store
//!
//! The frontier maps not-yet-fetched URLs to their discovery depth. The
//! dedup store holds every URL already handed to a page worker. Both live in
//! one struct so that enqueue checks and dispatch moves happen in a single
//! critical section of the owning mutex.

use std::collections::{HashMap, HashSet};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

/// Work queue plus the set of URLs already dispatched
#[derive(Debug, Default)]
pub struct Frontier {
    queued: HashMap<String, FrontierEntry>,
    loaded: HashSet<String>,
    max_depth: u32,
    current_depth: u32,
}

impl Frontier {
    /// Creates an empty frontier; `max_depth` 0 means unlimited
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    /// Queues a URL unless it is already queued, already loaded, or too deep
    ///
    /// The first path to reach a URL fixes its depth; later attempts are
    /// dropped silently. Returns true if the entry was added.
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        if self.max_depth > 0 && depth > self.max_depth {
            tracing::trace!("Depth {} exceeds limit for {}", depth, url);
            return false;
        }

        let key = url.as_str();
        if self.queued.contains_key(key) || self.loaded.contains(key) {
            return false;
        }

        self.queued
            .insert(key.to_string(), FrontierEntry { url, depth });
        self.current_depth = depth;
        true
    }

    /// Removes up to `capacity` entries for dispatch
    ///
    /// Removed URLs move straight into the dedup store, so no URL is ever
    /// dispatched twice. Selection order is unspecified.
    pub fn take_ready(&mut self, capacity: usize) -> Vec<FrontierEntry> {
        if capacity == 0 || self.queued.is_empty() {
            return Vec::new();
        }

        let keys: Vec<String> = self.queued.keys().take(capacity).cloned().collect();

        keys.into_iter()
            .filter_map(|key| {
                let entry = self.queued.remove(&key)?;
                self.loaded.insert(key);
                Some(entry)
            })
            .collect()
    }

    /// Discards every queued entry (used when a crawl is stopped)
    pub fn clear(&mut self) -> usize {
        let discarded = self.queued.len();
        self.queued.clear();
        discarded
    }

    /// Returns true if no entries are waiting
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Number of entries waiting
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Number of URLs already dispatched
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Returns true if the URL has been dispatched
    pub fn is_loaded(&self, url: &str) -> bool {
        self.loaded.contains(url)
    }

    /// Returns the queued depth of a URL, if it is waiting
    pub fn queued_depth(&self, url: &str) -> Option<u32> {
        self.queued.get(url).map(|entry| entry.depth)
    }

    /// Depth of the most recently queued entry
    pub fn current_depth(&self) -> u32 {
        self.current_depth
    }
}
