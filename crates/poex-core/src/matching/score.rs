//! Candidate scoring: a pure function from (query, catalog entry) to a
//! structured breakdown, so every signal is independently testable and the
//! total is auditable.

use std::collections::HashSet;

use crate::catalog::ReferenceEntry;
use crate::models::config::MatchingConfig;
use crate::text::{bracketed_code, normalize, significant_tokens};

/// Independent signals contributing to a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Extracted branch name contained in the catalog branch label.
    BranchContains,
    /// Catalog branch label contained in the extracted branch name.
    BranchContained,
    /// Long common substring between the two branch names.
    BranchFuzzy,
    /// Bracketed numeric code from the catalog branch label found in the
    /// extracted branch/address text.
    BranchCode,
    /// Candidate's distinguishing branch token (branch label minus
    /// retailer name) found in the extracted name+address.
    DistinctBranchToken,
    /// Address token overlap above the strong ratio threshold.
    AddressOverlapStrong,
    /// Address token overlap above the weak ratio threshold.
    AddressOverlapWeak,
    /// Retailer-specific geographic keyword present on both sides.
    LocationKeyword,
}

/// Per-signal contributions for one candidate. Total is capped at 100.
#[derive(Debug, Clone, Default)]
pub struct ScoreBreakdown {
    contributions: Vec<(Signal, u32)>,
}

impl ScoreBreakdown {
    fn push(&mut self, signal: Signal, weight: u32) {
        self.contributions.push((signal, weight));
    }

    /// Individual signal contributions, in evaluation order.
    pub fn contributions(&self) -> &[(Signal, u32)] {
        &self.contributions
    }

    /// Capped total score.
    pub fn total(&self) -> u32 {
        self.contributions
            .iter()
            .map(|(_, w)| w)
            .sum::<u32>()
            .min(100)
    }

    pub fn has(&self, signal: Signal) -> bool {
        self.contributions.iter().any(|(s, _)| *s == signal)
    }
}

/// Pre-normalized view of the extracted identity fields, computed once per
/// resolve call and shared across all candidates.
#[derive(Debug)]
pub struct MatchQuery {
    pub name_upper: String,
    pub address_upper: String,
    pub branch_upper: String,
    pub name_clean: String,
    pub address_clean: String,
    pub branch_clean: String,
    pub address_tokens: HashSet<String>,
}

impl MatchQuery {
    pub fn new(retailer_raw: &str, address_raw: &str, branch_raw: &str) -> Self {
        Self {
            name_upper: retailer_raw.to_uppercase(),
            address_upper: address_raw.to_uppercase(),
            branch_upper: branch_raw.to_uppercase(),
            name_clean: normalize(retailer_raw),
            address_clean: normalize(address_raw),
            branch_clean: normalize(branch_raw),
            address_tokens: significant_tokens(address_raw),
        }
    }

    /// True when every token of a space-separated group appears in the
    /// extracted retailer name.
    pub fn name_has_tokens(&self, tokens: &[String]) -> bool {
        !tokens.is_empty()
            && tokens
                .iter()
                .all(|t| self.name_upper.contains(&t.to_uppercase()))
    }

    pub fn name_has_token_group(&self, group: &str) -> bool {
        let tokens: Vec<String> = group.split_whitespace().map(str::to_string).collect();
        self.name_has_tokens(&tokens)
    }
}

/// Score one catalog entry against the query. Purely additive; adding a
/// matching signal can never lower the total.
pub fn score_candidate(
    query: &MatchQuery,
    entry: &ReferenceEntry,
    config: &MatchingConfig,
) -> ScoreBreakdown {
    let weights = &config.weights;
    let mut breakdown = ScoreBreakdown::default();

    // Branch-name containment, either direction, then fuzzy overlap.
    // Skipped entirely when either side is empty.
    if query.branch_clean.len() > config.min_branch_len && !entry.normalized_branch.is_empty() {
        if entry.normalized_branch.contains(&query.branch_clean) {
            breakdown.push(Signal::BranchContains, weights.branch_contains);
        } else if query.branch_clean.contains(&entry.normalized_branch) {
            breakdown.push(Signal::BranchContained, weights.branch_contained);
        } else if crate::text::longest_common_substring(
            &query.branch_clean,
            &entry.normalized_branch,
        ) > config.min_fuzzy_overlap
        {
            breakdown.push(Signal::BranchFuzzy, weights.branch_fuzzy);
        }
    }

    // Bracketed numeric branch code, e.g. "(6104)" in the catalog label
    // appearing anywhere in the extracted branch or address text.
    if let Some(code) = entry.branch_label.as_deref().and_then(bracketed_code) {
        if query.branch_upper.contains(&code) || query.address_upper.contains(&code) {
            breakdown.push(Signal::BranchCode, weights.branch_code);
        }
    }

    // The candidate's distinguishing branch token: its branch label with
    // the retailer name removed. "CSGROCER(KAJANGMEWAH)(KM)" minus
    // "CSGROCER" leaves "KAJANGMEWAHKM".
    if !entry.normalized_branch.is_empty() {
        let distinct = entry
            .normalized_branch
            .replace(&entry.normalized_name, "");
        if distinct.len() > config.min_distinct_token_len {
            let haystack = format!("{}{}", query.name_clean, query.address_clean);
            if haystack.contains(&distinct) {
                breakdown.push(Signal::DistinctBranchToken, weights.distinct_branch_token);
            }
        }
    }

    // Address token overlap, ratio of shared significant tokens over the
    // candidate's significant tokens, bucketed at two thresholds.
    if let Some(address) = entry.delivery_address.as_deref() {
        let entry_tokens = significant_tokens(address);
        if !entry_tokens.is_empty() {
            let common = entry_tokens.intersection(&query.address_tokens).count();
            let ratio = common as f64 / entry_tokens.len() as f64;
            if ratio > config.overlap_strong_ratio {
                breakdown.push(Signal::AddressOverlapStrong, weights.address_overlap_strong);
            } else if ratio > config.overlap_weak_ratio {
                breakdown.push(Signal::AddressOverlapWeak, weights.address_overlap_weak);
            }
        }
    }

    // Retailer-specific location keywords, matched on both sides of the
    // address or the branch text. One boost per rule.
    for boost in &config.location_boosts {
        if !query.name_has_tokens(&boost.retailer_tokens) {
            continue;
        }
        let entry_address = entry
            .delivery_address
            .as_deref()
            .unwrap_or_default()
            .to_uppercase();
        let entry_branch = entry
            .branch_label
            .as_deref()
            .unwrap_or_default()
            .to_uppercase();
        for keyword in &boost.keywords {
            let kw = keyword.to_uppercase();
            let address_hit =
                query.address_upper.contains(&kw) && entry_address.contains(&kw);
            let branch_hit = query.branch_upper.contains(&kw) && entry_branch.contains(&kw);
            if address_hit || branch_hit {
                breakdown.push(Signal::LocationKeyword, boost.weight);
                break;
            }
        }
    }

    breakdown
}
