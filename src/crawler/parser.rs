//! HTML analyzer for extracting link and image references
//!
//! Only raw attribute values are extracted here; turning them into
//! crawlable URLs is the link filter's job.

use scraper::{Html, Selector};

/// A reference found in a document, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `<a href="...">`
    Link(String),
    /// `<img src="...">`
    Image(String),
}

/// References extracted from one page, split by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Anchor targets, in document order
    pub links: Vec<String>,

    /// Image sources, in document order
    pub images: Vec<String>,
}

/// Extracts anchor and image references from an HTML body
///
/// The body is decoded as UTF-8, replacing invalid sequences. Attribute
/// values are trimmed and empty values are skipped.
///
/// # Example
///
/// ```
/// use sumi_crawl::crawler::{extract_references, Reference};
///
/// let html = br#"<a href="/docs">Docs</a><img src="logo.png">"#;
/// let refs = extract_references(html).unwrap();
/// assert_eq!(
///     refs,
///     vec![
///         Reference::Link("/docs".to_string()),
///         Reference::Image("logo.png".to_string()),
///     ]
/// );
/// ```
pub fn extract_references(body: &[u8]) -> Result<Vec<Reference>, String> {
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);

    let selector = Selector::parse("a[href], img[src]")
        .map_err(|e| format!("invalid reference selector: {:?}", e))?;

    let references = document
        .select(&selector)
        .filter_map(|element| {
            let element = element.value();
            match element.name() {
                "a" => non_empty(element.attr("href")).map(Reference::Link),
                "img" => non_empty(element.attr("src")).map(Reference::Image),
                _ => None,
            }
        })
        .collect();

    Ok(references)
}

/// Extracts references and splits them into links and images
pub fn parse_page(body: &[u8]) -> Result<ParsedPage, String> {
    let mut page = ParsedPage::default();

    for reference in extract_references(body)? {
        match reference {
            Reference::Link(href) => page.links.push(href),
            Reference::Image(src) => page.images.push(src),
        }
    }

    Ok(page)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
