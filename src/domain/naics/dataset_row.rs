// ============================================================
// DATASET ROW TYPES
// ============================================================
// Firm-count records as loaded from the dataset file

use serde::{Deserialize, Serialize};

use super::firm_size::{parse_firm_count, parse_firm_size};

pub const NAICS_CODE_COLUMN: &str = "naics_code";
pub const INDUSTRY_DESCRIPTION_COLUMN: &str = "industry_description";
pub const FIRM_SIZE_COLUMN: &str = "firm_size";
pub const NUMBER_OF_FIRMS_COLUMN: &str = "number_of_firms";

pub const REQUIRED_COLUMNS: [&str; 4] = [
    NAICS_CODE_COLUMN,
    INDUSTRY_DESCRIPTION_COLUMN,
    FIRM_SIZE_COLUMN,
    NUMBER_OF_FIRMS_COLUMN,
];

/// One record of the firm-count table. Values are kept as raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRow {
    pub sector_code: String,
    pub industry_description: String,
    pub firm_size_label: String,
    pub number_of_firms: String,
}

impl DatasetRow {
    pub fn new(
        sector_code: impl Into<String>,
        industry_description: impl Into<String>,
        firm_size_label: impl Into<String>,
        number_of_firms: impl Into<String>,
    ) -> Self {
        Self {
            sector_code: sector_code.into(),
            industry_description: industry_description.into(),
            firm_size_label: firm_size_label.into(),
            number_of_firms: number_of_firms.into(),
        }
    }

    pub fn firm_size(&self) -> u64 {
        parse_firm_size(&self.firm_size_label)
    }

    /// `None` when the count cell is not a non-negative integer.
    pub fn firm_count(&self) -> Option<u64> {
        parse_firm_count(&self.number_of_firms)
    }
}

/// A loaded dataset: the verbatim records plus their typed projection.
///
/// `records[i]` and `rows[i]` describe the same line of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    rows: Vec<DatasetRow>,
}

impl DatasetTable {
    /// Caller guarantees `records` and `rows` are parallel.
    pub(crate) fn new(headers: Vec<String>, records: Vec<Vec<String>>, rows: Vec<DatasetRow>) -> Self {
        debug_assert_eq!(records.len(), rows.len());
        Self {
            headers,
            records,
            rows,
        }
    }

    /// Build a table whose only columns are the four required ones.
    pub fn from_rows(rows: Vec<DatasetRow>) -> Self {
        let headers = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        let records = rows
            .iter()
            .map(|row| {
                vec![
                    row.sector_code.clone(),
                    row.industry_description.clone(),
                    row.firm_size_label.clone(),
                    row.number_of_firms.clone(),
                ]
            })
            .collect();
        Self {
            headers,
            records,
            rows,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
