//! Output module for run reports
//!
//! This module handles:
//! - Computing run statistics (record kinds, sources, field coverage)
//! - Generating markdown reports
//! - Exporting runs as JSON

mod json;
mod markdown;
pub mod stats;

pub use json::{write_json_report, JsonReport};
pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{print_statistics, FieldCoverage, RunStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
