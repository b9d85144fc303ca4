use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::naics::is_two_digit_code;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static CODE_SEPARATOR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;\n]").unwrap());

/// Strips reasoning tags some models prepend to their answer.
pub fn clean_llm_response(response: &str) -> String {
    let cleaned = THINK_TAG_PATTERN.replace_all(response, "");
    let cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Split a model reply such as `"54, 62"` into trimmed, non-empty tokens.
pub fn split_code_list(text: &str) -> Vec<String> {
    CODE_SEPARATOR_PATTERN
        .split(text)
        .map(|token| token.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '.')))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

/// Keep tokens that are exactly two ASCII digits, first occurrence wins.
pub fn retain_two_digit_codes<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut codes: Vec<String> = Vec::new();
    for token in tokens {
        let token = token.as_ref().trim();
        if is_two_digit_code(token) && !codes.iter().any(|c| c == token) {
            codes.push(token.to_string());
        }
    }
    codes
}
