//! Output module for reporting crawl results
//!
//! This module handles:
//! - Formatting one line per delivered page result
//! - Recording crawl statistics and printing the final summary

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};

use crate::crawler::{CrawlResult, ImageOutcome};

/// Formats a page result as a single report line
///
/// # Examples
///
/// ```
/// use sumi_crawl::output::format_result_line;
/// use sumi_crawl::{CrawlResult, FetchError};
///
/// let result = CrawlResult::failed(
///     "http://x.test/missing".to_string(),
///     2,
///     FetchError::Status { url: "http://x.test/missing".to_string(), status: 404 },
/// );
/// assert_eq!(
///     format_result_line(&result),
///     "[depth 2] ERR http://x.test/missing (HTTP status 404 for http://x.test/missing)"
/// );
/// ```
pub fn format_result_line(result: &CrawlResult) -> String {
    match &result.outcome {
        Ok(response) => {
            let mut line = format!(
                "[depth {}] {} {} ({} bytes",
                result.depth,
                response.status,
                result.uri,
                response.body.len()
            );

            if !result.images.is_empty() {
                let fetched = result
                    .images
                    .iter()
                    .filter(|image| image.outcome.is_fetched_ok())
                    .count();
                let cached = result
                    .images
                    .iter()
                    .filter(|image| matches!(image.outcome, ImageOutcome::AlreadyLoaded))
                    .count();
                let failed = result.images.len() - fetched - cached;
                line.push_str(&format!(
                    ", images: {} fetched, {} already loaded, {} failed",
                    fetched, cached, failed
                ));
            }

            line.push(')');
            line
        }
        Err(e) => format!("[depth {}] ERR {} ({})", result.depth, result.uri, e),
    }
}
