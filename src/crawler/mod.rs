//! Crawler module: discovery, fetching and aggregation of listing records
//!
//! This module contains the core harvesting logic, including:
//! - Sublink crawling of listing/category pages
//! - Per-domain request limiting
//! - The aggregation controller that turns a query into records

mod aggregator;
mod scheduler;
mod sublinks;

pub use aggregator::Aggregator;
pub use scheduler::{DomainLimiter, DomainPermit};
pub use sublinks::{extract_detail_links, find_detail_links};

use crate::sites::ListingFields;
use serde::Serialize;

/// What a record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Fields extracted from a fetched page (possibly partially)
    Listing,
    /// The URL's domain has no registered parser
    Unsupported,
    /// Fetching or parsing failed; the message is in `title`
    Error,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Unsupported => "unsupported",
            Self::Error => "error",
        }
    }
}

/// One harvested listing
///
/// `link` is always the canonical URL. `source_tag` names the fetch strategy
/// (or fallback) that produced the page content; it is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    pub link: String,
    pub title: String,
    pub price: String,
    pub area: String,
    pub description: String,
    pub image: String,
    pub contact: String,
    pub source_tag: String,
    pub kind: RecordKind,
}

impl ListingRecord {
    /// Builds a record from extracted fields
    pub fn from_fields(link: &str, fields: ListingFields, source_tag: &str) -> Self {
        Self {
            link: link.to_string(),
            title: fields.title,
            price: fields.price,
            area: fields.area,
            description: fields.description,
            image: fields.image,
            contact: fields.contact,
            source_tag: source_tag.to_string(),
            kind: RecordKind::Listing,
        }
    }

    /// Error marker standing in for a URL that could not be harvested
    pub fn error(link: &str, message: &str, source_tag: &str) -> Self {
        Self {
            title: format!("Extraction failed: {}", message),
            source_tag: source_tag.to_string(),
            kind: RecordKind::Error,
            ..Self::blank(link)
        }
    }

    /// Sentinel for a URL whose domain has no registered parser
    pub fn unsupported(link: &str) -> Self {
        Self {
            title: "Unsupported domain".to_string(),
            source_tag: "none".to_string(),
            kind: RecordKind::Unsupported,
            ..Self::blank(link)
        }
    }

    fn blank(link: &str) -> Self {
        Self {
            link: link.to_string(),
            title: String::new(),
            price: String::new(),
            area: String::new(),
            description: String::new(),
            image: String::new(),
            contact: String::new(),
            source_tag: String::new(),
            kind: RecordKind::Listing,
        }
    }

    pub fn is_listing(&self) -> bool {
        self.kind == RecordKind::Listing
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Discovery and extraction ran to the end
    Completed,
    /// Discovery found no candidate URL at all
    NoResults,
    /// The run was cancelled or hit its deadline; records are partial
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NoResults => "no_results",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result of one aggregation run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub query: String,
    pub target_total: usize,
    pub status: RunStatus,
    pub records: Vec<ListingRecord>,
}

impl RunReport {
    pub fn new(query: &str, target_total: usize, status: RunStatus, records: Vec<ListingRecord>) -> Self {
        Self {
            query: query.to_string(),
            target_total,
            status,
            records,
        }
    }

    /// Returns true if discovery came back empty
    pub fn is_no_results(&self) -> bool {
        self.status == RunStatus::NoResults
    }

    /// Records of the `index`-th display page of `size` records
    ///
    /// # Examples
    ///
    /// ```
    /// use bds_harvest::{ListingRecord, RunReport, RunStatus};
    ///
    /// let records = (0..25)
    ///     .map(|i| ListingRecord::unsupported(&format!("https://example.com/{}", i)))
    ///     .collect();
    /// let report = RunReport::new("Bán nhà Quận 3", 30, RunStatus::Completed, records);
    ///
    /// assert_eq!(report.batch(0, 10).len(), 10);
    /// assert_eq!(report.batch(2, 10).len(), 5);
    /// assert!(report.batch(3, 10).is_empty());
    /// assert!(report.has_more(20));
    /// assert!(!report.has_more(25));
    /// ```
    pub fn batch(&self, index: usize, size: usize) -> &[ListingRecord] {
        let start = index.saturating_mul(size).min(self.records.len());
        let end = start.saturating_add(size).min(self.records.len());
        &self.records[start..end]
    }

    /// Returns true if records remain after the first `shown`
    pub fn has_more(&self, shown: usize) -> bool {
        shown < self.records.len()
    }
}
