//! URL handling module for bds-harvest
//!
//! This module provides URL canonicalization, domain extraction, domain-suffix
//! matching, and detail/listing link classification.

mod domain;
mod matcher;
mod normalize;
pub mod patterns;

use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::matches_domain_suffix;
pub use normalize::{canonicalize, canonicalize_url};

/// Link classification types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// A single-listing page; fetched and parsed directly
    Detail,
    /// A category/search page; crawled for detail links
    Listing,
    /// Matches neither pattern set; treated like a listing page
    Unknown,
}

impl LinkClass {
    /// Returns true if the page should be parsed as a listing record
    pub fn is_detail(&self) -> bool {
        matches!(self, Self::Detail)
    }

    /// Returns true if the page should be crawled for sublinks
    ///
    /// Unknown pages are crawled rather than dropped so that detail pages
    /// with an uncatalogued path shape are still reached through their
    /// parent listing.
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::Listing | Self::Unknown)
    }
}

/// A discovered URL with its canonical form and classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    /// The URL exactly as discovered
    pub raw: String,

    /// Canonical form used for deduplication
    pub canonical: String,

    /// Lowercase host, empty when the URL has none
    pub domain: String,

    pub class: LinkClass,
}

impl CandidateUrl {
    /// Canonicalizes and classifies a discovered URL
    pub fn new(raw: &str, base: Option<&str>) -> Self {
        let canonical = canonicalize(raw, base);
        let domain = extract_domain(&canonical).unwrap_or_default();
        let class = classify(&canonical);

        Self {
            raw: raw.to_string(),
            canonical,
            domain,
            class,
        }
    }
}

/// Classifies a URL by its path
///
/// Detail patterns take precedence: a path matching both sets is a detail
/// page. Strings that fail to parse as URLs are classified as bare paths.
///
/// # Examples
///
/// ```
/// use bds_harvest::url::{classify, LinkClass};
///
/// assert_eq!(
///     classify("https://alonhadat.com.vn/-ban-nha-2-mat-tien-quan-10--17025352.html"),
///     LinkClass::Detail
/// );
/// assert_eq!(classify("https://alonhadat.com.vn/nha-dat"), LinkClass::Listing);
/// assert_eq!(classify("https://example.com/"), LinkClass::Unknown);
/// ```
pub fn classify(url: &str) -> LinkClass {
    match Url::parse(url) {
        Ok(parsed) => classify_path(parsed.path()),
        Err(_) => classify_path(url),
    }
}

/// Classifies a bare URL path
pub fn classify_path(path: &str) -> LinkClass {
    if let Some(name) = patterns::match_detail(path) {
        tracing::trace!("Path {} matched detail pattern {}", path, name);
        return LinkClass::Detail;
    }

    if let Some(name) = patterns::match_listing(path) {
        tracing::trace!("Path {} matched listing pattern {}", path, name);
        return LinkClass::Listing;
    }

    LinkClass::Unknown
}
