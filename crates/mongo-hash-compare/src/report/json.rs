//! JSON report.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{ensure_parent, Report, ReportRow, ReportSink};
use crate::error::Result;
use crate::verify::{ComparisonRecord, Summary, Verdict};

/// Writes a pretty-printed JSON document.
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Local>,
    verdict: Verdict,
    summary: &'a Summary,
    rows: Vec<ReportRow>,
    records: &'a [ComparisonRecord],
}

impl ReportSink for JsonReportSink {
    fn write(&self, report: &Report<'_>) -> Result<()> {
        ensure_parent(&self.path)?;

        let document = JsonReport {
            generated_at: report.generated_at,
            verdict: report.summary.verdict(),
            summary: report.summary,
            rows: report.rows().collect(),
            records: report.records,
        };

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!("JSON report saved to: {}", self.path.display());
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Digest;

    #[test]
    fn test_writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let records = vec![
            ComparisonRecord::database("testdb", Digest::present("a", Some(1), None), Digest::present("a", Some(2), None)),
            ComparisonRecord::collection("testdb", "users", Digest::present("u", None, None), Digest::present("u", None, None)),
        ];
        let summary = Summary::from_records(&records);

        JsonReportSink::new(&path)
            .write(&Report::new(&records, &summary))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["verdict"], "PASS");
        assert_eq!(json["summary"]["databases"]["total"], 1);
        assert_eq!(json["rows"][1]["Collection"], "users");
        assert_eq!(json["records"][0]["status"], "match");
        assert_eq!(json["records"][0]["source"]["state"], "present");
    }
}
