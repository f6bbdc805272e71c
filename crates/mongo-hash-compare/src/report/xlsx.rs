//! Spreadsheet report with a comparison sheet and a summary sheet.

use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{ensure_parent, Report, ReportSink, COLUMNS};
use crate::error::Result;
use crate::verify::MatchStatus;

const COMPARISON_SHEET: &str = "Hash Comparison";
const SUMMARY_SHEET: &str = "Summary";
const MAX_COLUMN_WIDTH: usize = 50;

const HEADER_FILL: u32 = 0xD9E1F2;
const MATCH_FILL: u32 = 0xE6F7E6;
const MISMATCH_FILL: u32 = 0xFFE6E6;
const MISSING_FILL: u32 = 0xFFF0E6;

/// Writes an `.xlsx` workbook.
pub struct XlsxReportSink {
    path: PathBuf,
}

impl XlsxReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn fill(rgb: u32) -> Format {
    Format::new()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(rgb))
}

fn row_format(status: MatchStatus) -> Format {
    match status {
        MatchStatus::Match => fill(MATCH_FILL),
        MatchStatus::Mismatch => fill(MISMATCH_FILL),
        MatchStatus::MissingSource | MatchStatus::MissingDest | MatchStatus::Unverified => {
            fill(MISSING_FILL)
        }
    }
}

impl ReportSink for XlsxReportSink {
    fn write(&self, report: &Report<'_>) -> Result<()> {
        ensure_parent(&self.path)?;

        let mut workbook = Workbook::new();
        workbook.push_worksheet(comparison_sheet(report)?);
        workbook.push_worksheet(summary_sheet(report)?);
        workbook.save(&self.path)?;

        info!("Excel report saved to: {}", self.path.display());
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn comparison_sheet(report: &Report<'_>) -> Result<Worksheet> {
    let mut sheet = Worksheet::new();
    sheet.set_name(COMPARISON_SHEET)?;

    let header = fill(HEADER_FILL).set_bold();
    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.len()).collect();
    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (idx, row) in report.rows().enumerate() {
        let line = idx as u32 + 1;
        let format = row_format(row.match_status);
        for (col, cell) in row.cells().iter().enumerate() {
            widths[col] = widths[col].max(cell.chars().count());
            sheet.write_string_with_format(line, col as u16, cell.as_str(), &format)?;
        }
        // Overwrite time cells as numbers so they sort and sum
        if let Some(ms) = row.source_time_ms {
            sheet.write_number_with_format(line, 8, ms as f64, &format)?;
        }
        if let Some(ms) = row.dest_time_ms {
            sheet.write_number_with_format(line, 9, ms as f64, &format)?;
        }
    }

    for (col, width) in widths.iter().enumerate() {
        let width = (width + 2).min(MAX_COLUMN_WIDTH);
        sheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(sheet)
}

fn summary_sheet(report: &Report<'_>) -> Result<Worksheet> {
    let mut sheet = Worksheet::new();
    sheet.set_name(SUMMARY_SHEET)?;

    let title = Format::new().set_bold().set_font_size(14);
    let label = Format::new().set_bold();

    let generated = report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string();
    sheet.write_string_with_format(0, 0, "MongoDB Hash Comparison Summary", &title)?;
    sheet.write_string_with_format(1, 0, "Generated on", &label)?;
    sheet.write_string(1, 1, generated.as_str())?;

    let mut widths = [31usize, generated.len()];
    let mut line = 3u32;
    for (name, value) in report.summary_table() {
        // Blank line between groups
        if name == "Total Collections" || name == "Overall Status" {
            line += 1;
        }
        sheet.write_string_with_format(line, 0, name, &label)?;
        match value.parse::<f64>() {
            Ok(number) => sheet.write_number(line, 1, number)?,
            Err(_) => sheet.write_string(line, 1, value.as_str())?,
        };
        widths[0] = widths[0].max(name.len());
        widths[1] = widths[1].max(value.len());
        line += 1;
    }

    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, (width + 2) as f64)?;
    }

    Ok(sheet)
}
