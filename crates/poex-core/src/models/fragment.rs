//! Per-page extraction fragments.
//!
//! A fragment is one candidate document from the external extractor for a
//! single page: possibly partial, possibly a continuation of the previous
//! page, possibly one of several documents sharing the page.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One page's raw extraction result for one candidate document.
///
/// Every field is optional; the extractor makes no guarantees. Scalar
/// values have already been resolved through the alias table and coerced
/// by [`crate::models::adapt`], so downstream code never touches raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFragment {
    /// Declared document type ("Purchase Order", "Invoice", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,

    /// Retailer name as printed on the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retailer: Option<String>,

    /// PO identifier, absent on continuation pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,

    /// Raw date strings, normalized at finalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub po_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,

    /// Currency code, either an explicit field or split off a prefixed
    /// total like "MYR 1,234.56".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Declared grand total for this page's view of the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    /// Line items in page order.
    #[serde(default)]
    pub items: Vec<LineItemFragment>,

    /// Zero-based page this fragment came from.
    pub page_index: usize,
}

/// One extracted line item. Numeric fields may have arrived as strings;
/// they are coerced at the adaptation boundary and `None` here means the
/// value was absent or uncoercible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItemFragment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
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

impl LineItemFragment {
    /// Identity key used for deduplication: non-empty barcode, else
    /// non-empty article code. Items without either are never deduplicated.
    pub fn identity_key(&self) -> Option<&str> {
        non_empty(self.barcode.as_deref()).or_else(|| non_empty(self.article_code.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
