// ============================================================
// REPORT EXPORTER
// ============================================================
// Summary and annotated-dataset CSV output

use csv::{ReaderBuilder, WriterBuilder};

use crate::domain::error::{AppError, Result};
use crate::domain::naics::{AggregateResult, DatasetTable};

pub const SUMMARY_HEADERS: [&str; 3] = ["NAICS Code", "Industry Description", "Addressable Firms"];
pub const ADDRESSABLE_COLUMN: &str = "addressable";

pub const SUMMARY_FILE_NAME: &str = "addressable_summary.csv";
pub const ANNOTATED_FILE_NAME: &str = "addressable_naics_data.csv";

/// One line per aggregate result under [`SUMMARY_HEADERS`].
pub fn export_summary(results: &[AggregateResult]) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(SUMMARY_HEADERS)?;
    for result in results {
        let total = result.total_firms.to_string();
        writer.write_record([
            result.sector_key.as_str(),
            result.description.as_str(),
            total.as_str(),
        ])?;
    }
    finish(writer)
}

/// Read a summary produced by [`export_summary`].
pub fn parse_summary(text: &str) -> Result<Vec<AggregateResult>> {
    let mut reader = ReaderBuilder::new().from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::Export(format!("Failed to read summary headers: {}", e)))?;
    if headers.iter().ne(SUMMARY_HEADERS) {
        return Err(AppError::Export(format!(
            "Unexpected summary headers: {:?}",
            headers
        )));
    }

    let mut results = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let total_firms = record
            .get(2)
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                AppError::Export(format!("Summary row {} has no firm total", index + 1))
            })?;
        results.push(AggregateResult {
            sector_key: record.get(0).unwrap_or_default().to_string(),
            description: record.get(1).unwrap_or_default().to_string(),
            total_firms,
        });
    }
    Ok(results)
}

/// The dataset as loaded, with a trailing `addressable` column.
///
/// A row is `yes` when the first two characters of its NAICS code equal a
/// result's sector key. Combined keys such as `31-33` are not expanded here.
pub fn export_annotated(table: &DatasetTable, results: &[AggregateResult]) -> Result<String> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());

    let mut header: Vec<&str> = table.headers().iter().map(String::as_str).collect();
    header.push(ADDRESSABLE_COLUMN);
    writer.write_record(&header)?;

    for (record, row) in table.records().iter().zip(table.rows()) {
        let prefix = two_char_prefix(&row.sector_code);
        let addressable = if results.iter().any(|r| r.sector_key == prefix) {
            "yes"
        } else {
            "no"
        };
        writer.write_record(record.iter().map(String::as_str).chain([addressable]))?;
    }
    finish(writer)
}

fn two_char_prefix(code: &str) -> &str {
    let code = code.trim();
    match code.char_indices().nth(2) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Export(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Export(format!("CSV is not UTF-8: {}", e)))
}
