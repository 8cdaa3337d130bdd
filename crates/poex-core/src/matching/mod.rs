//! Retailer/branch identity resolution against the reference catalog.
//!
//! OCR and the extraction model both drift on spelling, so resolution is a
//! weighted accumulation of independent signals rather than exact lookup.
//! An unresolved retailer is a normal outcome, never an error.

mod score;

pub use score::{score_candidate, MatchQuery, ScoreBreakdown, Signal};

use tracing::debug;

use crate::catalog::{ReferenceCatalog, ReferenceEntry};
use crate::models::config::{FilterField, MatchingConfig};

/// Standardized identity fields of the winning catalog entry.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub retailer_name: String,
    pub debtor_code: Option<String>,
    pub branch_code: Option<String>,
    pub delivery_address: Option<String>,
    pub branch_label: Option<String>,
}

/// Result of one resolve call. `resolved` is `None` below the acceptance
/// threshold; callers keep the extracted values in that case.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub resolved: Option<ResolvedIdentity>,
    pub score: u32,
    pub breakdown: ScoreBreakdown,
}

impl MatchOutcome {
    fn no_match() -> Self {
        Self {
            resolved: None,
            score: 0,
            breakdown: ScoreBreakdown::default(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Scores extracted identity fields against every catalog candidate.
pub struct IdentityMatcher<'a> {
    catalog: &'a ReferenceCatalog,
    config: &'a MatchingConfig,
}

impl<'a> IdentityMatcher<'a> {
    pub fn new(catalog: &'a ReferenceCatalog, config: &'a MatchingConfig) -> Self {
        Self { catalog, config }
    }

    /// Resolve an extracted (retailer, address, branch) triple.
    ///
    /// Ties at the maximum score go to the first candidate in catalog
    /// order, which is stable across runs.
    pub fn resolve(
        &self,
        retailer_raw: &str,
        address_raw: &str,
        branch_raw: &str,
    ) -> MatchOutcome {
        if self.catalog.is_empty() {
            return MatchOutcome::no_match();
        }

        let query = MatchQuery::new(retailer_raw, address_raw, branch_raw);
        let pool = self.candidate_pool(&query);

        let mut best: Option<(&ReferenceEntry, ScoreBreakdown)> = None;
        for entry in pool {
            let breakdown = score_candidate(&query, entry, self.config);
            let total = breakdown.total();
            let current_best = best.as_ref().map(|(_, b)| b.total()).unwrap_or(0);
            if total > current_best {
                best = Some((entry, breakdown));
            }
        }

        let Some((entry, breakdown)) = best else {
            return MatchOutcome::no_match();
        };

        let score = breakdown.total();
        if score < self.threshold(&query) {
            debug!(
                retailer = retailer_raw,
                score, "best candidate below acceptance threshold"
            );
            return MatchOutcome::no_match();
        }

        MatchOutcome {
            resolved: Some(ResolvedIdentity {
                retailer_name: entry.retailer_name.clone(),
                debtor_code: entry.debtor_code.clone(),
                branch_code: entry.branch_code.clone(),
                delivery_address: entry.delivery_address.clone(),
                branch_label: entry.branch_label.clone(),
            }),
            score,
            breakdown,
        }
    }

    /// Narrow the catalog to plausible candidates. Group filters handle
    /// brands whose extracted names do not substring-match their rows;
    /// otherwise plain normalized-name containment applies. An empty pool
    /// falls back to the entire catalog so an unrecognized brand string
    /// never hard-fails matching.
    fn candidate_pool(&self, query: &MatchQuery) -> Vec<&ReferenceEntry> {
        let entries = self.catalog.entries();

        let filtered: Vec<&ReferenceEntry> = if let Some(filter) = self
            .config
            .group_filters
            .iter()
            .find(|f| query.name_has_tokens(&f.retailer_tokens))
        {
            entries
                .iter()
                .filter(|e| {
                    let field = match filter.field {
                        FilterField::Group => &e.normalized_group,
                        FilterField::Name => &e.normalized_name,
                    };
                    field.contains(&filter.needle)
                })
                .collect()
        } else {
            entries
                .iter()
                .filter(|e| e.normalized_name.contains(&query.name_clean))
                .collect()
        };

        if filtered.is_empty() {
            entries.iter().collect()
        } else {
            filtered
        }
    }

    /// Acceptance threshold, lowered for retailers known to carry sparse
    /// branch metadata.
    fn threshold(&self, query: &MatchQuery) -> u32 {
        let sparse = self
            .config
            .sparse_retailers
            .iter()
            .any(|group| query.name_has_token_group(group));
        if sparse {
            self.config.sparse_min_score
        } else {
            self.config.min_score
        }
    }
}
