//! bds-harvest: real-estate listing harvester
//!
//! This crate turns a free-text query into a deduplicated set of structured
//! listing records. Candidate detail pages are discovered through a search API
//! and link-following, fetched through escalating fetch strategies, and parsed
//! by per-site extraction cascades.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod output;
pub mod search;
pub mod sites;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for harvest runs
///
/// Failures local to a single URL never surface here; they are absorbed into
/// that URL's record. Only configuration problems and fatal search-provider
/// failures abort a run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search provider error: {0}")]
    Search(#[from] SearchError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Search-provider errors
#[derive(Debug, Error)]
pub enum SearchError {
    /// Authentication or quota failure; no further discovery can succeed
    #[error("search API refused the request ({code}): {message}")]
    Fatal { code: u16, message: String },

    /// The API rejected the query text itself
    #[error("search API rejected the query: {message}")]
    InvalidQuery { message: String },

    #[error("search API transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search API returned an unreadable response: {0}")]
    Decode(String),
}

impl SearchError {
    /// Returns true if this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::RunConfig;
pub use crawler::{Aggregator, ListingRecord, RecordKind, RunReport, RunStatus};
pub use fetch::{FetchResolver, FetchResult, FetchStatus, PageFetcher, Strategy};
pub use search::{GoogleSearch, SearchProvider};
pub use sites::{Registry, SiteParser};
pub use url::{canonicalize, classify, extract_domain, LinkClass};
