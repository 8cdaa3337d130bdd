//! Date normalization for extractor output.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

/// Accepted input formats, tried in order. Separators are stripped before
/// matching, so `%d %m %Y`-style entries cover `.`/`-`/space variants.
const FORMATS: &[&str] = &[
    "%Y %m %d",
    "%d %m %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d %b %y",
    "%d/%m/%y",
    "%Y/%m/%d",
];

lazy_static! {
    static ref EMBEDDED_ISO: Regex = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap();
}

/// Parse a date string in any of the extractor's observed formats.
/// Returns `None` rather than erroring; an unparsable date is left empty.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim().replace(',', "");
    if trimmed.is_empty() {
        return None;
    }

    let cleaned = trimmed.replace(['.', '-'], " ");
    for fmt in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(date);
        }
    }

    // Last resort: an ISO date embedded in surrounding text.
    if let Some(caps) = EMBEDDED_ISO.captures(&trimmed) {
        let y = caps[1].parse().ok()?;
        let m = caps[2].parse().ok()?;
        let d = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    None
}
