//! Finalized purchase-order documents.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A finalized, enriched purchase order. Produced exactly once per logical
/// PO by the merge engine; immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PODocument {
    /// Retailer name, standardized against the catalog when matched,
    /// otherwise the extracted value.
    pub retailer_name: Option<String>,
    pub retailer_name_standardized: Option<String>,

    /// Catalog debtor code of the matched retailer/branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debtor_code: Option<String>,

    pub branch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_code: Option<String>,
    pub delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,

    /// Cleaned PO identifier. May legitimately be empty for retailers
    /// that print none.
    pub po_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub po_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,

    pub currency: String,
    pub total_amount: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    /// Catalog match confidence, 0-100. Zero means unmatched.
    pub reliability_score: u32,

    pub items: Vec<LineItem>,

    /// Soft amount-reconciliation flag; never blocks persistence.
    pub is_flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_reason: Option<String>,

    /// Whether a PO with this number is already persisted.
    pub already_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_message: Option<String>,

    /// Source file metadata attached at finalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
}

/// A finalized line item. `None` numeric fields were absent or
/// uncoercible in the extractor output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_total: Option<Decimal>,
}
