// ============================================================
// FIRM SIZE PARSING
// ============================================================
// Turn free-text size buckets and firm counts into integers

use once_cell::sync::Lazy;
use regex::Regex;

static DIGIT_RUN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Representative employee count for a size label.
///
/// Returns the largest run of decimal digits found in the label, so a range
/// such as "20 to 99" counts as 99. Labels without digits yield 0; runs too
/// long for `u64` saturate.
pub fn parse_firm_size(label: &str) -> u64 {
    DIGIT_RUN_PATTERN
        .find_iter(label)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .max()
        .unwrap_or(0)
}

/// Parse a `number_of_firms` cell.
///
/// Thousands separators are accepted ("1,204"). Returns `None` for anything
/// that is not a non-negative integer; callers count that as zero.
pub fn parse_firm_count(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.replace(',', "").parse::<u64>().ok()
}
