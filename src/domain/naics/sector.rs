// ============================================================
// SECTOR CODES
// ============================================================
// Grouping codes, combined sector buckets, and relevant-sector sets

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::domain::error::{AppError, Result};

/// NAICS sectors reported under one combined code.
const DEFAULT_GROUP_KEYS: [&str; 3] = ["31-33", "44-45", "48-49"];

/// Read-only table mapping member codes to their combined sector key.
///
/// Every two-digit code maps to at most one key. Hyphenated keys are never
/// members themselves, so they normalize to themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorGroups {
    members: HashMap<String, String>,
}

impl Default for SectorGroups {
    fn default() -> Self {
        Self::naics()
    }
}

impl SectorGroups {
    /// The combined sectors of the NAICS 2-digit level.
    pub fn naics() -> Self {
        let mut members = HashMap::new();
        for key in DEFAULT_GROUP_KEYS {
            if let Some((start, end)) = parse_group_range(key) {
                for code in start..=end {
                    members.insert(format!("{:02}", code), key.to_string());
                }
            }
        }
        Self { members }
    }

    /// A table with no combined sectors; every code is its own key.
    pub fn empty() -> Self {
        Self {
            members: HashMap::new(),
        }
    }

    /// Build a table from hyphenated keys such as `"31-33"`.
    pub fn from_group_keys<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut members = HashMap::new();
        for key in keys {
            let key = key.as_ref().trim();
            let (start, end) = parse_group_range(key).ok_or_else(|| {
                AppError::Config(format!("Invalid sector group key: {:?}", key))
            })?;
            for code in start..=end {
                let code = format!("{:02}", code);
                if let Some(existing) = members.insert(code.clone(), key.to_string()) {
                    return Err(AppError::Config(format!(
                        "Sector code {} belongs to both {} and {}",
                        code, existing, key
                    )));
                }
            }
        }
        Ok(Self { members })
    }

    /// Canonical aggregation key for a raw code.
    pub fn normalize(&self, raw_code: &str) -> String {
        let trimmed = raw_code.trim();
        match self.members.get(trimmed) {
            Some(key) => key.clone(),
            None => trimmed.to_string(),
        }
    }

    pub fn is_group_key(&self, code: &str) -> bool {
        self.members.values().any(|key| key == code)
    }
}

/// `"31-33"` -> `(31, 33)`. Both ends must be two digits and ascending.
fn parse_group_range(key: &str) -> Option<(u8, u8)> {
    let (start, end) = key.split_once('-')?;
    if !is_two_digit_code(start) || !is_two_digit_code(end) {
        return None;
    }
    let start: u8 = start.parse().ok()?;
    let end: u8 = end.parse().ok()?;
    (start <= end).then_some((start, end))
}

pub fn is_two_digit_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_digit())
}

/// The code a dataset row is grouped under before normalization.
///
/// Hyphenated codes are kept whole; anything else is cut to its first two
/// characters.
pub fn extract_grouping_code(raw_code: &str) -> &str {
    let code = raw_code.trim();
    if code.contains('-') {
        return code;
    }
    match code.char_indices().nth(2) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}

/// Canonical sector keys selected for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelevantSectorSet(BTreeSet<String>);

impl RelevantSectorSet {
    /// Keep tokens that are two-digit codes or known combined keys, and fold
    /// group members into their combined key. Anything else is dropped.
    pub fn from_codes<I, S>(codes: I, groups: &SectorGroups) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = codes
            .into_iter()
            .filter_map(|code| {
                let code = code.as_ref().trim();
                if is_two_digit_code(code) || groups.is_group_key(code) {
                    Some(groups.normalize(code))
                } else {
                    None
                }
            })
            .collect();
        Self(set)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
