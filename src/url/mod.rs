//! URL handling module for Sumi-Crawl
//!
//! This module provides origin parsing, host identity, and the link filter
//! that turns references found in documents into crawlable URLs.

mod filter;
mod origin;

pub use filter::{HostPolicy, LinkFilter, RelativeBase};
pub use origin::{host_key, parse_origin};

/// Removes repeated URLs while keeping first-seen order
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_crawl::url::dedup_preserving_order;
///
/// let a = Url::parse("http://x.test/a.png").unwrap();
/// let b = Url::parse("http://x.test/b.png").unwrap();
/// let unique = dedup_preserving_order(vec![a.clone(), b.clone(), a.clone()]);
/// assert_eq!(unique, vec![a, b]);
/// ```
pub fn dedup_preserving_order(urls: Vec<::url::Url>) -> Vec<::url::Url> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}
