// ============================================================
// AGGREGATION ENGINE
// ============================================================
// Filter dataset rows by relevant sector and size, sum firms per sector

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::naics::{
    extract_grouping_code, AggregateResult, DataQualityReport, DatasetRow, RelevantSectorSet,
    SectorGroups,
};

/// Output of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// One entry per sector key, sorted by key.
    pub results: Vec<AggregateResult>,
    pub warnings: DataQualityReport,
}

struct SectorTotal {
    description: String,
    total_firms: u64,
    included_rows: usize,
}

pub struct AggregationEngine {
    groups: SectorGroups,
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(SectorGroups::naics())
    }
}

impl AggregationEngine {
    pub fn new(groups: SectorGroups) -> Self {
        Self { groups }
    }

    /// Sector key a row is grouped under.
    pub fn canonical_key(&self, row: &DatasetRow) -> String {
        self.groups.normalize(extract_grouping_code(&row.sector_code))
    }

    /// Sum firms of rows whose sector is relevant and whose size label reaches
    /// `size_threshold`.
    ///
    /// A sector's description comes from the first relevant row seen for it,
    /// even when that row is below the threshold and adds nothing to the total.
    pub fn aggregate(
        &self,
        rows: &[DatasetRow],
        relevant: &RelevantSectorSet,
        size_threshold: u64,
    ) -> Aggregation {
        let mut totals: BTreeMap<String, SectorTotal> = BTreeMap::new();
        let mut warnings = DataQualityReport::default();

        for row in rows {
            if row.sector_code.trim().is_empty() {
                warnings.skipped_empty_codes += 1;
                continue;
            }

            let key = self.canonical_key(row);
            if !relevant.contains(&key) {
                continue;
            }

            let entry = totals.entry(key).or_insert_with(|| SectorTotal {
                description: row.industry_description.clone(),
                total_firms: 0,
                included_rows: 0,
            });

            if row.firm_size() < size_threshold {
                continue;
            }

            entry.included_rows += 1;
            match row.firm_count() {
                Some(count) => entry.total_firms = entry.total_firms.saturating_add(count),
                None => warnings.zeroed_firm_counts += 1,
            }
        }

        if !warnings.is_clean() {
            warn!(
                zeroed_firm_counts = warnings.zeroed_firm_counts,
                skipped_empty_codes = warnings.skipped_empty_codes,
                "Dataset rows tolerated during aggregation"
            );
        }

        let results: Vec<AggregateResult> = totals
            .into_iter()
            .filter(|(_, total)| total.included_rows > 0)
            .map(|(sector_key, total)| AggregateResult {
                sector_key,
                description: total.description,
                total_firms: total.total_firms,
            })
            .collect();

        debug!(
            rows = rows.len(),
            sectors = results.len(),
            size_threshold,
            "Aggregation complete"
        );

        Aggregation { results, warnings }
    }
}
