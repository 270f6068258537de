use serde::Deserialize;
use std::collections::HashMap;

/// Main configuration structure for Sumi-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    /// Extra request headers applied to every fetch
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// The seed URL; its host bounds the crawl
    pub seed: String,

    /// Maximum hop count from the seed (0 = unlimited)
    #[serde(rename = "max-depth", default)]
    pub max_depth: u32,

    /// Maximum number of concurrent page fetches
    #[serde(rename = "max-workers", default = "default_workers")]
    pub max_workers: usize,

    /// Per-fetch timeout in seconds (0 = no timeout)
    #[serde(default)]
    pub timeout: u64,

    /// User agent override
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Resolve relative links against the page they appear on instead of the origin root
    #[serde(rename = "resolve-against-page", default)]
    pub resolve_against_page: bool,
}

/// Image loading configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Fetch `<img src>` targets before reporting each page
    #[serde(default)]
    pub enabled: bool,

    /// Number of long-lived image workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Allow images hosted on other hosts than the seed
    #[serde(rename = "cross-host", default = "default_true")]
    pub cross_host: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            workers: default_workers(),
            cross_host: true,
        }
    }
}

/// HTTP basic auth credentials
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

fn default_workers() -> usize {
    1
}

fn default_true() -> bool {
    true
}
