//! Report rendering.
//!
//! A [`ReportSink`] persists the full ordered record sequence together with
//! its [`Summary`]. Records are flattened into [`ReportRow`]s first so every
//! sink shows the same cells: hash values, `MISSING` for absence and
//! `ERROR: ...` for failed probes.

mod json;
mod xlsx;

pub use json::JsonReportSink;
pub use xlsx::XlsxReportSink;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::ReportFormat;
use crate::error::Result;
use crate::verify::{ComparisonRecord, Digest, EntityKind, MatchStatus, Summary};

/// Column headers of the comparison table.
pub const COLUMNS: [&str; 10] = [
    "Type",
    "Database",
    "Collection",
    "Source_Hash",
    "Destination_Hash",
    "Match",
    "Source_Host",
    "Dest_Host",
    "Source_Time_ms",
    "Dest_Time_ms",
];

const MISSING: &str = "MISSING";
const NO_HOST: &str = "N/A";

/// Everything a sink needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub generated_at: DateTime<Local>,
    pub records: &'a [ComparisonRecord],
    pub summary: &'a Summary,
}

impl<'a> Report<'a> {
    pub fn new(records: &'a [ComparisonRecord], summary: &'a Summary) -> Self {
        Self {
            generated_at: Local::now(),
            records,
            summary,
        }
    }

    /// Rendered rows, in record order.
    pub fn rows(&self) -> impl Iterator<Item = ReportRow> + 'a {
        self.records.iter().map(ReportRow::from)
    }

    /// Label/value pairs for the summary table.
    pub fn summary_table(&self) -> Vec<(&'static str, String)> {
        let s = self.summary;
        vec![
            ("Total Databases", s.databases.total.to_string()),
            ("Database Mismatches", s.databases.mismatches.to_string()),
            ("Missing Databases", s.databases.missing.to_string()),
            ("Unverified Databases", s.databases.unverified.to_string()),
            ("Total Collections", s.collections.total.to_string()),
            ("Collection Mismatches", s.collections.mismatches.to_string()),
            ("Missing Collections", s.collections.missing.to_string()),
            ("Unverified Collections", s.collections.unverified.to_string()),
            ("Overall Status", s.verdict().to_string()),
        ]
    }
}

/// One flattened row of the comparison table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportRow {
    #[serde(rename = "Type")]
    pub kind: String,
    pub database: String,
    pub collection: String,
    #[serde(rename = "Source_Hash")]
    pub source_hash: String,
    #[serde(rename = "Destination_Hash")]
    pub destination_hash: String,
    #[serde(rename = "Match")]
    pub status: String,
    #[serde(rename = "Source_Host")]
    pub source_host: String,
    #[serde(rename = "Dest_Host")]
    pub dest_host: String,
    #[serde(rename = "Source_Time_ms")]
    pub source_time_ms: Option<u64>,
    #[serde(rename = "Dest_Time_ms")]
    pub dest_time_ms: Option<u64>,
    #[serde(skip)]
    pub match_status: MatchStatus,
}

impl ReportRow {
    /// Cells in [`COLUMNS`] order.
    pub fn cells(&self) -> [String; 10] {
        let time = |t: Option<u64>| t.map(|v| v.to_string()).unwrap_or_default();
        [
            self.kind.clone(),
            self.database.clone(),
            self.collection.clone(),
            self.source_hash.clone(),
            self.destination_hash.clone(),
            self.status.clone(),
            self.source_host.clone(),
            self.dest_host.clone(),
            time(self.source_time_ms),
            time(self.dest_time_ms),
        ]
    }
}

impl From<&ComparisonRecord> for ReportRow {
    fn from(record: &ComparisonRecord) -> Self {
        // Times are only meaningful for database-level probes
        let time = |d: &Digest| match record.kind() {
            EntityKind::Database => d.elapsed_ms(),
            EntityKind::Collection => None,
        };

        Self {
            kind: record.kind().to_string(),
            database: record.database_name().to_string(),
            collection: record.collection_name().unwrap_or_default().to_string(),
            source_hash: hash_cell(record.source()),
            destination_hash: hash_cell(record.dest()),
            status: record.status().label().to_string(),
            source_host: host_cell(record.source()),
            dest_host: host_cell(record.dest()),
            source_time_ms: time(record.source()),
            dest_time_ms: time(record.dest()),
            match_status: record.status(),
        }
    }
}

fn hash_cell(digest: &Digest) -> String {
    match digest {
        Digest::Present { value, .. } => value.clone(),
        Digest::Absent => MISSING.to_string(),
        Digest::Errored { reason } => format!("ERROR: {}", reason),
    }
}

fn host_cell(digest: &Digest) -> String {
    match digest {
        Digest::Errored { .. } => "ERROR".to_string(),
        other => other.host().unwrap_or(NO_HOST).to_string(),
    }
}

/// Persists a finished comparison.
pub trait ReportSink: Send + Sync {
    /// Write the report.
    fn write(&self, report: &Report<'_>) -> Result<()>;

    /// Where the report goes.
    fn path(&self) -> &Path;
}

/// Create the parent directory of `path` if it has one.
fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(std::fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

/// Sink for the configured format.
pub fn sink_for(format: ReportFormat, path: PathBuf) -> Box<dyn ReportSink> {
    match format {
        ReportFormat::Xlsx => Box::new(XlsxReportSink::new(path)),
        ReportFormat::Json => Box::new(JsonReportSink::new(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(v: &str, ms: Option<u64>) -> Digest {
        Digest::present(v, ms, Some(format!("{}-host:27017", v)))
    }

    #[test]
    fn test_database_row() {
        let record = ComparisonRecord::database("shop", present("a", Some(10)), present("b", Some(12)));
        let row = ReportRow::from(&record);
        assert_eq!(
            row.cells(),
            [
                "Database",
                "shop",
                "",
                "a",
                "b",
                "MISMATCH",
                "a-host:27017",
                "b-host:27017",
                "10",
                "12"
            ]
            .map(String::from)
        );
    }

    #[test]
    fn test_collection_row_has_no_times() {
        let record = ComparisonRecord::collection("shop", "orders", present("a", Some(10)), present("a", Some(12)));
        let row = ReportRow::from(&record);
        assert_eq!(row.collection, "orders");
        assert_eq!(row.status, "MATCH");
        assert_eq!(row.source_time_ms, None);
        assert_eq!(row.dest_time_ms, None);
    }

    #[test]
    fn test_absent_and_errored_are_distinguishable() {
        let absent = ReportRow::from(&ComparisonRecord::database("a", present("x", None), Digest::Absent));
        let errored = ReportRow::from(&ComparisonRecord::database(
            "a",
            present("x", None),
            Digest::errored("timed out after 600s"),
        ));
        assert_eq!(absent.destination_hash, "MISSING");
        assert_eq!(absent.dest_host, "N/A");
        assert_eq!(errored.destination_hash, "ERROR: timed out after 600s");
        assert_eq!(errored.dest_host, "ERROR");
        assert_eq!(absent.status, errored.status);
        assert_eq!(absent.status, "MISSING IN DESTINATION");
    }

    #[test]
    fn test_summary_table() {
        let records = vec![ComparisonRecord::database("a", Digest::Absent, present("x", None))];
        let summary = Summary::from_records(&records);
        let report = Report::new(&records, &summary);
        let table = report.summary_table();
        assert!(table.contains(&("Missing Databases", "1".to_string())));
        assert_eq!(table.last().unwrap(), &("Overall Status", "FAIL".to_string()));
    }

    #[test]
    fn test_row_json_uses_column_names() {
        let record = ComparisonRecord::database("shop", present("a", Some(1)), Digest::Absent);
        let json = serde_json::to_value(ReportRow::from(&record)).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        for column in COLUMNS {
            assert!(keys.iter().any(|k| k == column), "missing column {}", column);
        }
    }
}
