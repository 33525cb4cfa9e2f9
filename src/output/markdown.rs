//! Markdown report generation
//!
//! This module generates a human-readable markdown report of a run: run
//! metadata, statistics, and one table row per record.

use crate::crawler::{RecordKind, RunReport};
use crate::output::stats::{sorted_counts, RunStatistics};
use crate::output::OutputResult;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Longest description excerpt shown in the records table
const DESCRIPTION_EXCERPT_CHARS: usize = 120;

/// Writes a markdown report of a run
///
/// # Arguments
///
/// * `report` - The finished run
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_report(report: &RunReport, output_path: &Path) -> OutputResult<()> {
    let stats = RunStatistics::from_report(report);
    let markdown = format_markdown_report(report, &stats, Utc::now());

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run as markdown
pub fn format_markdown_report(
    report: &RunReport,
    stats: &RunStatistics,
    generated_at: DateTime<Utc>,
) -> String {
    let mut md = String::new();

    // Title
    md.push_str("# Listing Harvest Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Query**: {}\n", escape_cell(&report.query)));
    md.push_str(&format!(
        "- **Generated**: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!("- **Status**: {}\n", report.status.as_str()));
    md.push_str(&format!(
        "- **Records**: {} of {} requested\n\n",
        stats.total_records, report.target_total
    ));

    if report.is_no_results() {
        md.push_str("No listings were found for this query. Try a broader query.\n");
        return md;
    }

    // Overall statistics
    md.push_str("## Statistics\n\n");
    md.push_str("| Kind | Count |\n");
    md.push_str("|------|-------|\n");
    for kind in [RecordKind::Listing, RecordKind::Error, RecordKind::Unsupported] {
        md.push_str(&format!("| {} | {} |\n", kind.as_str(), stats.count(kind)));
    }
    md.push_str(&format!(
        "\n- **Success Rate**: {:.2}%\n\n",
        stats.success_rate()
    ));

    if !stats.records_by_source.is_empty() {
        md.push_str("### Sources\n\n");
        for (source, count) in sorted_counts(&stats.records_by_source) {
            md.push_str(&format!("- {}: {}\n", source, count));
        }
        md.push('\n');
    }

    let listings = stats.count(RecordKind::Listing);
    if listings > 0 {
        md.push_str("### Field Coverage\n\n");
        md.push_str("| Field | Resolved |\n");
        md.push_str("|-------|----------|\n");
        for (field, count) in stats.field_coverage.entries() {
            md.push_str(&format!("| {} | {} / {} |\n", field, count, listings));
        }
        md.push('\n');
    }

    // Records
    md.push_str("## Records\n\n");
    md.push_str("| # | Title | Price | Area | Contact | Description | Source |\n");
    md.push_str("|---|-------|-------|------|---------|-------------|--------|\n");
    for (index, record) in report.records.iter().enumerate() {
        let title = if record.title.is_empty() {
            "(untitled)".to_string()
        } else {
            escape_cell(&record.title)
        };
        md.push_str(&format!(
            "| {} | [{}]({}) | {} | {} | {} | {} | {} |\n",
            index + 1,
            title,
            record.link,
            escape_cell(&record.price),
            escape_cell(&record.area),
            escape_cell(&record.contact),
            escape_cell(&excerpt(&record.description, DESCRIPTION_EXCERPT_CHARS)),
            record.source_tag,
        ));
    }

    md
}

/// Makes text safe inside a markdown table cell
fn escape_cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Cuts text to `max_chars` characters, marking the cut with an ellipsis
fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}
