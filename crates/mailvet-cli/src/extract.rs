//! Email address extraction
//!
//! Pulls syntactically plausible addresses out of pasted text or file
//! content. Zero matches is not an error here; the caller decides whether
//! an empty result is acceptable.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")
        .unwrap_or_else(|e| unreachable!("email pattern is a valid regex: {e}"))
});

/// Extract unique addresses from `text`, first occurrence wins
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    EMAIL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|email| seen.insert(*email))
        .map(str::to_string)
        .collect()
}
