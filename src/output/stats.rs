//! Statistics computed from a run's records
//!
//! This module provides functionality for summarizing a finished run and
//! printing the summary to the terminal.

use crate::crawler::{ListingRecord, RecordKind, RunReport};
use crate::url::extract_domain;
use serde::Serialize;
use std::collections::HashMap;

/// How many listing records resolved each field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldCoverage {
    pub title: u64,
    pub price: u64,
    pub area: u64,
    pub description: u64,
    pub image: u64,
    pub contact: u64,
}

impl FieldCoverage {
    fn add(&mut self, record: &ListingRecord) {
        let count = |slot: &mut u64, value: &str| {
            if !value.is_empty() {
                *slot += 1;
            }
        };
        count(&mut self.title, &record.title);
        count(&mut self.price, &record.price);
        count(&mut self.area, &record.area);
        count(&mut self.description, &record.description);
        count(&mut self.image, &record.image);
        count(&mut self.contact, &record.contact);
    }

    /// `(field name, count)` pairs in schema order
    pub fn entries(&self) -> [(&'static str, u64); 6] {
        [
            ("title", self.title),
            ("price", self.price),
            ("area", self.area),
            ("description", self.description),
            ("image", self.image),
            ("contact", self.contact),
        ]
    }
}

/// Run statistics summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    /// Total number of records returned
    pub total_records: u64,

    /// Count of records by kind
    pub records_by_kind: HashMap<RecordKind, u64>,

    /// Count of records by the strategy or fallback that produced them
    pub records_by_source: HashMap<String, u64>,

    /// Count of records by host
    pub records_by_domain: HashMap<String, u64>,

    /// Field coverage over listing records only
    pub field_coverage: FieldCoverage,
}

impl RunStatistics {
    /// Computes statistics for a report
    pub fn from_report(report: &RunReport) -> Self {
        Self::from_records(&report.records)
    }

    pub fn from_records(records: &[ListingRecord]) -> Self {
        let mut stats = Self::default();

        for record in records {
            stats.total_records += 1;
            *stats.records_by_kind.entry(record.kind).or_insert(0) += 1;
            *stats
                .records_by_source
                .entry(record.source_tag.clone())
                .or_insert(0) += 1;

            let domain = extract_domain(&record.link).unwrap_or_else(|| "unknown".to_string());
            *stats.records_by_domain.entry(domain).or_insert(0) += 1;

            if record.is_listing() {
                stats.field_coverage.add(record);
            }
        }

        stats
    }

    pub fn count(&self, kind: RecordKind) -> u64 {
        self.records_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Percentage of records that are listings
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        (self.count(RecordKind::Listing) as f64 / self.total_records as f64) * 100.0
    }
}

/// Sorts a count map by count (descending), then key
pub fn sorted_counts<K: Clone + Ord>(counts: &HashMap<K, u64>) -> Vec<(K, u64)> {
    let mut entries: Vec<(K, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(report: &RunReport, stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Query: {}", report.query);
    println!("  Status: {}", report.status.as_str());
    println!(
        "  Records: {} of {} requested",
        stats.total_records, report.target_total
    );
    println!();

    println!("Records by Kind:");
    for kind in [RecordKind::Listing, RecordKind::Error, RecordKind::Unsupported] {
        println!("  {}: {}", kind.as_str(), stats.count(kind));
    }
    println!();

    if !stats.records_by_source.is_empty() {
        println!("Records by Source:");
        for (source, count) in sorted_counts(&stats.records_by_source) {
            println!("  {}: {}", source, count);
        }
        println!();
    }

    let listings = stats.count(RecordKind::Listing);
    if listings > 0 {
        println!("Field Coverage:");
        for (field, count) in stats.field_coverage.entries() {
            println!(
                "  {}: {} / {} ({:.1}%)",
                field,
                count,
                listings,
                (count as f64 / listings as f64) * 100.0
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} records extracted)",
        stats.success_rate(),
        listings,
        stats.total_records
    );
}
