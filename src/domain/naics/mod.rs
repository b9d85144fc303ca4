// ============================================================
// NAICS DOMAIN LAYER
// ============================================================
// Dataset rows, sector codes, and analysis value objects
// No I/O, no async

mod analysis;
mod dataset_row;
mod firm_size;
mod sector;

pub use analysis::{AggregateResult, AnalysisOutcome, AnalysisQuery, DataQualityReport};
pub use dataset_row::{
    DatasetRow, DatasetTable, FIRM_SIZE_COLUMN, INDUSTRY_DESCRIPTION_COLUMN, NAICS_CODE_COLUMN,
    NUMBER_OF_FIRMS_COLUMN, REQUIRED_COLUMNS,
};
pub use firm_size::{parse_firm_count, parse_firm_size};
pub use sector::{extract_grouping_code, is_two_digit_code, RelevantSectorSet, SectorGroups};
