// ============================================================
// ANALYSIS VALUE OBJECTS
// ============================================================
// Query input, aggregate rows, and the published outcome of a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::sector::RelevantSectorSet;
use crate::domain::error::{AppError, Result};

/// Input to one analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQuery {
    #[validate(custom(function = "validate_not_blank"))]
    pub description: String,

    /// Minimum representative employee count; 0 keeps size-unknown rows.
    #[serde(default)]
    pub size_threshold: u64,
}

fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("description must not be empty".into());
        return Err(err);
    }
    Ok(())
}

impl AnalysisQuery {
    /// Build and validate a query.
    pub fn new(description: impl Into<String>, size_threshold: u64) -> Result<Self> {
        let query = Self {
            description: description.into(),
            size_threshold,
        };
        query.ensure_valid()?;
        Ok(query)
    }

    pub fn ensure_valid(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AppError::InputValidation(e.to_string()))
    }
}

/// One row of analysis output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub sector_key: String,
    pub description: String,
    pub total_firms: u64,
}

/// Rows the aggregation tolerated instead of failing on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    /// Included rows whose firm count was not an integer and counted as 0.
    pub zeroed_firm_counts: usize,
    /// Rows with an empty sector code.
    pub skipped_empty_codes: usize,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.zeroed_firm_counts == 0 && self.skipped_empty_codes == 0
    }
}

/// Everything produced by a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub run_id: u64,
    pub query: AnalysisQuery,
    pub relevant_codes: RelevantSectorSet,
    pub results: Vec<AggregateResult>,
    pub warnings: DataQualityReport,
    pub completed_at: DateTime<Utc>,
}

impl AnalysisOutcome {
    pub fn total_addressable_firms(&self) -> u64 {
        self.results.iter().map(|r| r.total_firms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_rejects_blank_description() {
        assert!(matches!(
            AnalysisQuery::new("", 0),
            Err(AppError::InputValidation(_))
        ));
        assert!(matches!(
            AnalysisQuery::new("   ", 10),
            Err(AppError::InputValidation(_))
        ));
    }

    #[test]
    fn test_query_accepts_description() {
        let query = AnalysisQuery::new("B2B payroll software", 20).unwrap();
        assert_eq!(query.size_threshold, 20);
    }

    #[test]
    fn test_query_deserializes_without_threshold() {
        let query: AnalysisQuery =
            serde_json::from_str(r#"{"description":"dental clinics"}"#).unwrap();
        assert_eq!(query.size_threshold, 0);
    }
}
