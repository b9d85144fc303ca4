// ============================================================
// DATASET READER
// ============================================================
// Parse the firm-count CSV into verbatim records and typed rows

use std::path::PathBuf;

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::domain::error::{AppError, Result};
use crate::domain::naics::{
    DatasetRow, DatasetTable, FIRM_SIZE_COLUMN, INDUSTRY_DESCRIPTION_COLUMN, NAICS_CODE_COLUMN,
    NUMBER_OF_FIRMS_COLUMN, REQUIRED_COLUMNS,
};

/// Where an analysis run gets its dataset from.
#[async_trait]
pub trait DatasetSource {
    async fn load(&self) -> Result<DatasetTable>;
}

/// Reads the dataset from a file on every load.
pub struct FileDatasetSource {
    path: PathBuf,
    reader: DatasetReader,
}

impl FileDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: DatasetReader::new(),
        }
    }
}

#[async_trait]
impl DatasetSource for FileDatasetSource {
    async fn load(&self) -> Result<DatasetTable> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            AppError::DatasetLoad(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let table = self.reader.parse_bytes(&bytes)?;
        info!(
            path = %self.path.display(),
            rows = table.len(),
            "Dataset loaded"
        );
        Ok(table)
    }
}

/// CSV reader for the firm-count dataset
pub struct DatasetReader {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for DatasetReader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Positions of the required columns within the header.
struct ColumnIndex {
    naics_code: usize,
    industry_description: usize,
    firm_size: usize,
    number_of_firms: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    AppError::DatasetLoad(format!(
                        "Missing required column '{}' (required: {})",
                        name,
                        REQUIRED_COLUMNS.join(", ")
                    ))
                })
        };

        Ok(Self {
            naics_code: find(NAICS_CODE_COLUMN)?,
            industry_description: find(INDUSTRY_DESCRIPTION_COLUMN)?,
            firm_size: find(FIRM_SIZE_COLUMN)?,
            number_of_firms: find(NUMBER_OF_FIRMS_COLUMN)?,
        })
    }
}

impl DatasetReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Decode raw file bytes (BOM stripped, invalid UTF-8 replaced) and parse.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DatasetTable> {
        let (content, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
        if had_errors {
            debug!("Dataset contained invalid UTF-8; replaced lossily");
        }
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<DatasetTable> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::None)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::DatasetLoad(format!("Failed to read CSV headers: {}", e)))?
            .clone();
        let columns = ColumnIndex::resolve(&headers)?;

        let mut records = Vec::new();
        let mut rows = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::DatasetLoad(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.len() > headers.len() {
                return Err(AppError::DatasetLoad(format!(
                    "CSV row {} has {} fields but the header has {}",
                    index + 1,
                    record.len(),
                    headers.len()
                )));
            }

            let mut values: Vec<String> = record.iter().map(|v| v.to_string()).collect();
            values.resize(headers.len(), String::new());

            rows.push(DatasetRow::new(
                values[columns.naics_code].clone(),
                values[columns.industry_description].clone(),
                values[columns.firm_size].clone(),
                values[columns.number_of_firms].clone(),
            ));
            records.push(values);
        }

        let headers = headers.iter().map(|h| h.to_string()).collect();
        Ok(DatasetTable::new(headers, records, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "naics_code,industry_description,firm_size,number_of_firms,state\n\
54,Professional Services,20-99,100,CA\n\
5415,\"Computer Systems Design, Related\",100-499,50,NY\n";

    #[test]
    fn test_parse_dataset() {
        let table = DatasetReader::new().parse_content(SAMPLE).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers().len(), 5);
        assert_eq!(table.rows()[1].industry_description, "Computer Systems Design, Related");
        assert_eq!(table.rows()[1].sector_code, "5415");
        assert_eq!(table.records()[0][4], "CA");
    }

    #[test]
    fn test_columns_resolved_by_name() {
        let content = "number_of_firms,firm_size,naics_code,industry_description\n7,1-4,62,Health\n";
        let table = DatasetReader::new().parse_content(content).unwrap();

        assert_eq!(table.rows()[0], DatasetRow::new("62", "Health", "1-4", "7"));
        assert_eq!(table.records()[0], vec!["7", "1-4", "62", "Health"]);
    }

    #[test]
    fn test_missing_column_is_load_error() {
        let content = "naics_code,industry_description,number_of_firms\n54,Prof,3\n";
        let err = DatasetReader::new().parse_content(content).unwrap_err();
        assert!(matches!(err, AppError::DatasetLoad(msg) if msg.contains("firm_size")));
    }

    #[test]
    fn test_short_rows_padded_and_blank_rows_kept() {
        let content = "naics_code,industry_description,firm_size,number_of_firms\n54,Prof\n,,,\n";
        let table = DatasetReader::new().parse_content(content).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0], vec!["54", "Prof", "", ""]);
        assert_eq!(table.rows()[0].number_of_firms, "");
        assert_eq!(table.records()[1], vec!["", "", "", ""]);
        assert_eq!(table.rows()[1].sector_code, "");
    }

    #[test]
    fn test_long_rows_rejected() {
        let content = "naics_code,industry_description,firm_size,number_of_firms\n54,Prof,1-4,3,extra\n";
        assert!(matches!(
            DatasetReader::new().parse_content(content),
            Err(AppError::DatasetLoad(_))
        ));
    }

    #[test]
    fn test_parse_bytes_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(SAMPLE.as_bytes());
        let table = DatasetReader::new().parse_bytes(&bytes).unwrap();
        assert_eq!(table.headers()[0], "naics_code");
    }

    #[test]
    fn test_semicolon_delimiter() {
        let content = "naics_code;industry_description;firm_size;number_of_firms\n62;Health;1-4;7\n";
        let table = DatasetReader::new()
            .with_delimiter(b';')
            .parse_content(content)
            .unwrap();
        assert_eq!(table.rows()[0].sector_code, "62");
    }

    #[tokio::test]
    async fn test_file_source_loads_and_reports_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let table = FileDatasetSource::new(file.path()).load().await.unwrap();
        assert_eq!(table.len(), 2);

        let missing = FileDatasetSource::new(file.path().with_extension("missing"));
        assert!(matches!(
            missing.load().await,
            Err(AppError::DatasetLoad(_))
        ));
    }
}
