use super::origin::host_key;
use crate::UrlError;
use url::Url;

/// Which hosts a resolved reference may point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPolicy {
    /// Only the origin's own host (and port)
    SameHost,
    /// Any host, as long as the scheme is HTTP-family
    AnyHost,
}

/// What a relative reference is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeBase {
    /// The origin's root: `page.html` on any document becomes `/page.html`
    Origin,
    /// The document the reference was found in
    Page,
}

/// Resolves references found in crawled documents into crawlable URLs
///
/// # Filtering Rules
///
/// | Reference | Result |
/// |-----------|--------|
/// | Empty or whitespace | Rejected |
/// | Non-HTTP scheme (`mailto:`, `javascript:`, `ftp:`) | Rejected |
/// | Host differs from origin (same-host policy) | Rejected |
/// | Relative path | Scheme and host inherited from the origin |
/// | Fragment (`#...`) | Always dropped |
/// | Query | Kept verbatim |
#[derive(Debug, Clone)]
pub struct LinkFilter {
    origin: Url,
    origin_host: String,
    root: Url,
    relative_base: RelativeBase,
    image_policy: HostPolicy,
}

impl LinkFilter {
    /// Creates a filter for the given origin
    ///
    /// Links are same-host only; images may come from any host; relative
    /// references resolve against the origin root.
    pub fn new(origin: Url) -> Result<Self, UrlError> {
        let origin_host = host_key(&origin).ok_or(UrlError::MissingHost)?;

        let mut root = origin.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);

        Ok(Self {
            origin,
            origin_host,
            root,
            relative_base: RelativeBase::Origin,
            image_policy: HostPolicy::AnyHost,
        })
    }

    /// Sets what relative references resolve against
    pub fn with_relative_base(mut self, base: RelativeBase) -> Self {
        self.relative_base = base;
        self
    }

    /// Sets the host policy applied to image references
    pub fn with_image_policy(mut self, policy: HostPolicy) -> Self {
        self.image_policy = policy;
        self
    }

    /// The origin this filter resolves against
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolves a hyperlink target; cross-host links are always rejected
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_crawl::url::{parse_origin, LinkFilter};
    ///
    /// let origin = parse_origin("http://x.test/a").unwrap();
    /// let filter = LinkFilter::new(origin.clone()).unwrap();
    ///
    /// let link = filter.resolve_link("/b#intro", &origin).unwrap();
    /// assert_eq!(link.as_str(), "http://x.test/b");
    ///
    /// assert!(filter.resolve_link("http://other.test/c", &origin).is_err());
    /// ```
    pub fn resolve_link(&self, candidate: &str, document: &Url) -> Result<Url, UrlError> {
        self.resolve(candidate, document, HostPolicy::SameHost)
    }

    /// Resolves an image source using the configured image host policy
    pub fn resolve_image(&self, candidate: &str, document: &Url) -> Result<Url, UrlError> {
        self.resolve(candidate, document, self.image_policy)
    }

    /// Resolves a reference under an explicit host policy
    pub fn resolve(
        &self,
        candidate: &str,
        document: &Url,
        policy: HostPolicy,
    ) -> Result<Url, UrlError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(UrlError::Empty);
        }

        let base = match self.relative_base {
            RelativeBase::Origin => &self.root,
            RelativeBase::Page => document,
        };

        let mut resolved = base
            .join(candidate)
            .map_err(|e| UrlError::Parse(e.to_string()))?;

        if !resolved.scheme().starts_with("http") {
            return Err(UrlError::InvalidScheme(resolved.scheme().to_string()));
        }

        let found = host_key(&resolved).ok_or(UrlError::MissingHost)?;
        if policy == HostPolicy::SameHost && found != self.origin_host {
            return Err(UrlError::ForeignHost {
                origin: self.origin_host.clone(),
                found,
            });
        }

        resolved.set_fragment(None);
        Ok(resolved)
    }
}
