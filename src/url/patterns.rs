//! Detail/listing path pattern table
//!
//! This table is an external contract with the supported sites: whenever a
//! site changes its URL scheme, this is the only place that needs editing.
//! Bump [`PATTERN_VERSION`] with every change so logs show which table
//! classified a run.

use lazy_static::lazy_static;
use regex::Regex;

/// Version of the pattern table below
pub const PATTERN_VERSION: u32 = 3;

/// Paths of single-listing pages
///
/// Each entry is `(name, pattern)`; patterns run against the URL path only.
const DETAIL_PATTERNS: &[(&str, &str)] = &[
    // alonhadat, i-batdongsan, nhatot: "...-17025352.html", ".../113456789.htm"
    ("numeric-id-suffix", r"(?i)[-/]\d{6,}\.html?$"),
    // batdongsan: "...-pr39912345"
    ("pr-id", r"(?i)-pr\d{5,}$"),
    // generic "tin" (post) marker: "/tin-123456"
    ("tin-id", r"(?i)/tin-\d{5,}(?:[-/.]|$)"),
    // guland: "/post/ban-nha-...-1234567"
    ("post-id", r"(?i)/post/[^/]*\d{5,}$"),
    // muaban: "...-id61234567"
    ("id-suffix", r"(?i)-id\d{5,}$"),
];

/// Paths of category/search pages that aggregate many listings
const LISTING_PATTERNS: &[(&str, &str)] = &[
    (
        "category-segment",
        r"(?i)/(?:nha-dat|mua-ban[a-z0-9-]*|cho-thue[a-z0-9-]*|can-ban[a-z0-9-]*|ban-[a-z0-9-]+|bat-dong-san[a-z0-9-]*|du-an[a-z0-9-]*)(?:/|$)",
    ),
    ("search-segment", r"(?i)/(?:tim-kiem|search|danh-muc|category)(?:/|$)"),
];

lazy_static! {
    static ref DETAIL_REGEXES: Vec<(&'static str, Regex)> = compile(DETAIL_PATTERNS);
    static ref LISTING_REGEXES: Vec<(&'static str, Regex)> = compile(LISTING_PATTERNS);
}

fn compile(table: &'static [(&'static str, &'static str)]) -> Vec<(&'static str, Regex)> {
    table
        .iter()
        .filter_map(|(name, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((*name, re)),
            Err(e) => {
                tracing::error!("Invalid URL pattern '{}': {}", name, e);
                None
            }
        })
        .collect()
}

/// Returns the name of the first detail pattern matching `path`
pub fn match_detail(path: &str) -> Option<&'static str> {
    DETAIL_REGEXES
        .iter()
        .find(|(_, re)| re.is_match(path))
        .map(|(name, _)| *name)
}

/// Returns the name of the first listing pattern matching `path`
pub fn match_listing(path: &str) -> Option<&'static str> {
    LISTING_REGEXES
        .iter()
        .find(|(_, re)| re.is_match(path))
        .map(|(name, _)| *name)
}
