//! JSON export of a run

use crate::crawler::{ListingRecord, RunReport, RunStatus};
use crate::output::stats::RunStatistics;
use crate::output::OutputResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Top-level document written by [`write_json_report`]
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub query: &'a str,
    pub target_total: usize,
    pub status: RunStatus,
    pub statistics: RunStatistics,
    pub records: &'a [ListingRecord],
}

impl<'a> JsonReport<'a> {
    pub fn new(report: &'a RunReport, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            query: &report.query,
            target_total: report.target_total,
            status: report.status,
            statistics: RunStatistics::from_report(report),
            records: &report.records,
        }
    }
}

/// Writes a run as pretty-printed JSON
pub fn write_json_report(report: &RunReport, output_path: &Path) -> OutputResult<()> {
    let document = JsonReport::new(report, Utc::now());

    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(())
}
