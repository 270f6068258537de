use crate::UrlError;
use url::Url;

/// Parses the crawl origin (the seed URL)
///
/// The origin must be an absolute URL with an `http`-family scheme and a
/// host. Any fragment is dropped so the seed dedups against links to it.
///
/// # Examples
///
/// ```
/// use sumi_crawl::url::parse_origin;
///
/// let origin = parse_origin("http://x.test/a#top").unwrap();
/// assert_eq!(origin.as_str(), "http://x.test/a");
///
/// assert!(parse_origin("/relative/path").is_err());
/// assert!(parse_origin("ftp://x.test/").is_err());
/// ```
pub fn parse_origin(uri: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(uri.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !url.scheme().starts_with("http") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Returns the host identity used for same-host checks
///
/// This is the lowercase host plus the port when it is not the scheme's
/// default, mirroring the `host[:port]` authority a browser would show.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_crawl::url::host_key;
///
/// let url = Url::parse("http://EXAMPLE.com:8080/path").unwrap();
/// assert_eq!(host_key(&url), Some("example.com:8080".to_string()));
///
/// let url = Url::parse("https://example.com:443/").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
