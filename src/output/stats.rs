//! Statistics aggregated from delivered crawl results
//!
//! This module provides a running summary that is fed one result at a time
//! as the crawl reports pages, and a printer for the final report.

use crate::crawler::{CrawlResult, ImageOutcome};
use crate::FetchError;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// When the crawl was started
    pub started_at: DateTime<Utc>,

    /// When the last result was recorded or the crawl was marked finished
    pub finished_at: Option<DateTime<Utc>>,

    /// Pages fetched and parsed successfully
    pub pages_ok: u64,

    /// Pages that failed to fetch or parse
    pub pages_failed: u64,

    /// Total body bytes of successful pages
    pub bytes_fetched: u64,

    /// Number of pages reported per depth
    pub pages_by_depth: BTreeMap<u32, u64>,

    /// Error kinds and their counts
    pub error_summary: HashMap<String, u64>,

    /// Images fetched for the first time
    pub images_fetched: u64,

    /// Image references answered with the already-loaded placeholder
    pub images_already_loaded: u64,

    /// Image fetches that failed
    pub images_failed: u64,
}

impl CrawlStatistics {
    /// Starts an empty summary timestamped now
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Starts an empty summary with an explicit start time
    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            pages_ok: 0,
            pages_failed: 0,
            bytes_fetched: 0,
            pages_by_depth: BTreeMap::new(),
            error_summary: HashMap::new(),
            images_fetched: 0,
            images_already_loaded: 0,
            images_failed: 0,
        }
    }

    /// Adds one page result to the summary
    pub fn record(&mut self, result: &CrawlResult) {
        *self.pages_by_depth.entry(result.depth).or_insert(0) += 1;

        match &result.outcome {
            Ok(response) => {
                self.pages_ok += 1;
                self.bytes_fetched += response.body.len() as u64;
            }
            Err(e) => {
                self.pages_failed += 1;
                *self.error_summary.entry(error_kind(e)).or_insert(0) += 1;
            }
        }

        for image in &result.images {
            match &image.outcome {
                ImageOutcome::Fetched(Ok(_)) => self.images_fetched += 1,
                ImageOutcome::Fetched(Err(_)) => self.images_failed += 1,
                ImageOutcome::AlreadyLoaded => self.images_already_loaded += 1,
            }
        }
    }

    /// Marks the crawl finished now
    pub fn finish(&mut self) {
        self.finish_at(Utc::now());
    }

    pub fn finish_at(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = Some(finished_at);
    }

    /// Total pages reported
    pub fn total_pages(&self) -> u64 {
        self.pages_ok + self.pages_failed
    }

    /// Wall-clock duration in seconds, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Groups an error under a short label for the summary
fn error_kind(error: &FetchError) -> String {
    match error {
        FetchError::Status { status, .. } => format!("HTTP {}", status),
        FetchError::Timeout { .. } => "Timeout".to_string(),
        FetchError::Connect { .. } => "Connection failed".to_string(),
        FetchError::Http { .. } => "HTTP error".to_string(),
        FetchError::Body { .. } => "Body read error".to_string(),
        FetchError::HtmlParse { .. } => "HTML parse error".to_string(),
        FetchError::ImagePoolStopped { .. } => "Image pool stopped".to_string(),
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(finished) = stats.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    if let Some(seconds) = stats.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!("  Pages reported: {}", stats.total_pages());
    println!("  Bytes fetched: {}", stats.bytes_fetched);
    println!();

    if !stats.pages_by_depth.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &stats.pages_by_depth {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    let images_total = stats.images_fetched + stats.images_already_loaded + stats.images_failed;
    if images_total > 0 {
        println!("Images:");
        println!("  Fetched: {}", stats.images_fetched);
        println!("  Already loaded: {}", stats.images_already_loaded);
        println!("  Failed: {}", stats.images_failed);
        println!();
    }

    let success_rate = if stats.total_pages() > 0 {
        (stats.pages_ok as f64 / stats.total_pages() as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched successfully)",
        success_rate,
        stats.pages_ok,
        stats.total_pages()
    );
}
