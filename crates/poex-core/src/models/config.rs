//! Configuration structures for the post-processing pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main configuration for the poex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoexConfig {
    /// Identity matching configuration.
    pub matching: MatchingConfig,

    /// Enrichment defaults.
    pub enrichment: EnrichmentConfig,

    /// Amount reconciliation configuration.
    pub reconcile: ReconcileConfig,
}

/// Identity matcher configuration. The defaults carry the production
/// weights and keyword lists; everything is overridable so new retailers
/// can be tuned without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum accepted score; below this the match is discarded.
    pub min_score: u32,

    /// Lowered threshold for retailers with sparse branch metadata.
    pub sparse_min_score: u32,

    /// Retailers granted the lowered threshold. Each entry is a
    /// space-separated token group; all tokens must appear in the
    /// extracted retailer name.
    pub sparse_retailers: Vec<String>,

    /// Signal weights for the additive scorer.
    pub weights: SignalWeights,

    /// Candidate-pool filters for brands whose extracted names do not
    /// substring-match their catalog rows directly.
    pub group_filters: Vec<GroupFilter>,

    /// Retailer-specific geographic keyword boosts.
    pub location_boosts: Vec<LocationBoost>,

    /// Minimum normalized branch-name length for containment signals.
    pub min_branch_len: usize,

    /// Minimum longest-common-substring length for the fuzzy branch signal.
    pub min_fuzzy_overlap: usize,

    /// Minimum length of the distinguishing branch token signal.
    pub min_distinct_token_len: usize,

    /// Address token-overlap ratio thresholds.
    pub overlap_strong_ratio: f64,
    pub overlap_weak_ratio: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_score: 15,
            sparse_min_score: 10,
            sparse_retailers: vec![
                "MYDIN".to_string(),
                "GIANT".to_string(),
                "CS GROCER".to_string(),
            ],
            weights: SignalWeights::default(),
            group_filters: vec![
                GroupFilter {
                    retailer_tokens: vec!["MYDIN".to_string()],
                    field: FilterField::Group,
                    needle: "MYDIN".to_string(),
                },
                GroupFilter {
                    retailer_tokens: vec!["CS".to_string(), "GROCER".to_string()],
                    field: FilterField::Name,
                    needle: "CSGROCER".to_string(),
                },
            ],
            location_boosts: vec![
                LocationBoost {
                    retailer_tokens: vec!["MYDIN".to_string()],
                    keywords: [
                        "PUTRAJAYA", "SHAH", "ALAM", "KLANG", "SEREMBAN", "SUBANG", "JAYA",
                        "KAJANG",
                    ]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                    weight: 40,
                },
                LocationBoost {
                    retailer_tokens: vec!["CS".to_string(), "GROCER".to_string()],
                    keywords: ["KAJANG", "MEWAH", "PLAZA", "METRO", "PUNCAK", "ALAM"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                    weight: 50,
                },
            ],
            min_branch_len: 5,
            min_fuzzy_overlap: 6,
            min_distinct_token_len: 4,
            overlap_strong_ratio: 0.4,
            overlap_weak_ratio: 0.2,
        }
    }
}

/// Additive score contributed by each matching signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    /// Extracted branch name contained in the catalog branch label.
    pub branch_contains: u32,
    /// Catalog branch label contained in the extracted branch name.
    pub branch_contained: u32,
    /// Fuzzy longest-common-substring branch overlap.
    pub branch_fuzzy: u32,
    /// Bracketed numeric branch code appearing in the extracted text.
    pub branch_code: u32,
    /// Candidate's distinguishing branch token found in name+address.
    pub distinct_branch_token: u32,
    /// Address token overlap above the strong / weak ratio thresholds.
    pub address_overlap_strong: u32,
    pub address_overlap_weak: u32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            branch_contains: 70,
            branch_contained: 60,
            branch_fuzzy: 40,
            branch_code: 55,
            distinct_branch_token: 50,
            address_overlap_strong: 40,
            address_overlap_weak: 20,
        }
    }
}

/// Which normalized catalog column a group filter matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    /// `retailers_group_name`, normalized.
    Group,
    /// `retailers_name`, normalized.
    Name,
}

/// Candidate-pool filter: when every token appears in the extracted
/// retailer name, restrict candidates to catalog rows whose selected
/// normalized field contains the needle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFilter {
    pub retailer_tokens: Vec<String>,
    pub field: FilterField,
    pub needle: String,
}

/// Geographic keyword boost for one retailer. The boost fires once per
/// candidate when a keyword appears on both sides (extracted and catalog)
/// of either the address or the branch text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationBoost {
    pub retailer_tokens: Vec<String>,
    pub keywords: Vec<String>,
    pub weight: u32,
}

/// Enrichment defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Currency assumed when the extractor returns none.
    pub default_currency: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            default_currency: "MYR".to_string(),
        }
    }
}

/// Amount reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Absolute difference (in currency units) above which a document is
    /// soft-flagged.
    pub tolerance: Decimal,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::ONE,
        }
    }
}

impl PoexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip() {
        let config = PoexConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PoexConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.matching.min_score, 15);
        assert_eq!(back.matching.weights.branch_contains, 70);
        assert_eq!(back.reconcile.tolerance, Decimal::ONE);
        assert_eq!(back.enrichment.default_currency, "MYR");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: PoexConfig =
            serde_json::from_str(r#"{"matching": {"min_score": 25}}"#).unwrap();
        assert_eq!(config.matching.min_score, 25);
        assert_eq!(config.matching.sparse_min_score, 10);
        assert_eq!(config.enrichment.default_currency, "MYR");
    }
}
