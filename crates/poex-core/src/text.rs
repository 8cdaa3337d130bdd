//! Text canonicalization used symmetrically on catalog entries and
//! extracted fragments.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").unwrap();
    static ref BRACKETED_CODE: Regex = Regex::new(r"\((\d+)\)").unwrap();
}

/// Canonicalize a free-text string for comparison: uppercase, then keep
/// only ASCII letters and digits. Idempotent.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(|c| c.to_uppercase())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Uppercased word tokens of a string.
pub fn tokens(text: &str) -> HashSet<String> {
    WORD.find_iter(&text.to_uppercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Word tokens longer than 3 characters. Short tokens (road types,
/// postcodes fragments) produce too many accidental address overlaps.
pub fn significant_tokens(text: &str) -> HashSet<String> {
    tokens(text).into_iter().filter(|t| t.len() > 3).collect()
}

/// First bracketed numeric code in a string, e.g. "(6104)" in
/// "Lotus's Kepong (6104)".
pub fn bracketed_code(text: &str) -> Option<String> {
    BRACKETED_CODE
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Length of the longest common substring of two strings.
///
/// Classic dynamic-programming table over bytes; both inputs are already
/// normalized ASCII here so byte comparison is safe.
pub fn longest_common_substring(a: &str, b: &str) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let mut best = 0;

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                curr[j] = prev[j - 1] + 1;
                if curr[j] > best {
                    best = curr[j];
                }
            } else {
                curr[j] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}
