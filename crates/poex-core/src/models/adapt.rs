//! Input adaptation boundary.
//!
//! The extractor returns loosely-typed JSON whose field names drift
//! (`qty` vs `quantity` vs `Quantity`). Each canonical field maps to an
//! ordered list of accepted source aliases, resolved exactly once here;
//! everything downstream operates on [`ExtractedFragment`] only.

use serde_json::Value;
use tracing::debug;

use super::fragment::{ExtractedFragment, LineItemFragment};
use crate::numbers::{coerce_decimal, parse_amount};

/// Canonical document-level fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocField {
    DocumentType,
    Retailer,
    PoNumber,
    PoDate,
    DeliveryDate,
    ExpiryDate,
    Currency,
    TotalAmount,
    BuyerName,
    DeliveryAddress,
    BranchName,
    BranchCode,
    TaxId,
    Items,
}

impl DocField {
    /// Accepted source key spellings, in resolution order.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            DocField::DocumentType => &["document_type", "doc_type"],
            DocField::Retailer => &["retailer", "retailer_name"],
            DocField::PoNumber => &["po_number", "po_no", "order_number"],
            DocField::PoDate => &["po_date", "order_date"],
            DocField::DeliveryDate => &["delivery_date", "deliver_by"],
            DocField::ExpiryDate => &["expiry_date", "cancel_date"],
            DocField::Currency => &["currency"],
            DocField::TotalAmount => &["total_amount", "grand_total", "total"],
            DocField::BuyerName => &["buyer_name", "buyer"],
            DocField::DeliveryAddress => &["delivery_address", "ship_to_address"],
            DocField::BranchName => &["branch_name", "store_name"],
            DocField::BranchCode => &["branch_code", "store_code", "site_code"],
            DocField::TaxId => &["tax_id", "sst_no"],
            DocField::Items => &["items", "line_items"],
        }
    }
}

/// Canonical line-item fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    ArticleCode,
    Barcode,
    Description,
    Quantity,
    Uom,
    UnitPrice,
    LineTotal,
}

impl ItemField {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            ItemField::ArticleCode => &["article_code", "Article Code", "sku"],
            ItemField::Barcode => &["barcode", "Barcode"],
            ItemField::Description => &[
                "article_description",
                "Article Description",
                "description",
            ],
            ItemField::Quantity => &["qty", "quantity", "Qty", "Quantity"],
            ItemField::Uom => &["uom", "UOM"],
            ItemField::UnitPrice => &["unit_price", "Unit Price"],
            ItemField::LineTotal => &["total_price", "line_total", "total", "Line Total"],
        }
    }
}

/// Resolve one candidate document into a canonical fragment.
///
/// Returns `None` when the candidate is not a JSON object; any individual
/// field that is missing or uncoercible simply stays empty.
pub fn adapt_candidate(candidate: &Value, page_index: usize) -> Option<ExtractedFragment> {
    if !candidate.is_object() {
        debug!(page_index, "skipping non-object extraction candidate");
        return None;
    }

    let mut fragment = ExtractedFragment {
        document_type: string_field(candidate, DocField::DocumentType),
        retailer: string_field(candidate, DocField::Retailer),
        po_number: string_field(candidate, DocField::PoNumber),
        po_date: string_field(candidate, DocField::PoDate),
        delivery_date: string_field(candidate, DocField::DeliveryDate),
        expiry_date: string_field(candidate, DocField::ExpiryDate),
        currency: string_field(candidate, DocField::Currency),
        buyer_name: string_field(candidate, DocField::BuyerName),
        delivery_address: string_field(candidate, DocField::DeliveryAddress),
        branch_name: string_field(candidate, DocField::BranchName),
        branch_code: string_field(candidate, DocField::BranchCode),
        tax_id: string_field(candidate, DocField::TaxId),
        page_index,
        ..Default::default()
    };

    // A string total may carry its currency ("MYR 1,234.56"); keep the
    // embedded code when no explicit currency field was present.
    if let Some(raw_total) = lookup(candidate, DocField::TotalAmount.aliases()) {
        match raw_total {
            Value::String(s) => {
                if let Some((embedded, amount)) = parse_amount(s) {
                    fragment.total_amount = Some(amount);
                    if fragment.currency.is_none() {
                        fragment.currency = embedded;
                    }
                }
            }
            other => fragment.total_amount = coerce_decimal(other),
        }
    }

    if let Some(Value::Array(raw_items)) = lookup(candidate, DocField::Items.aliases()) {
        fragment.items = raw_items.iter().filter_map(adapt_item).collect();
    }

    Some(fragment)
}

fn adapt_item(raw: &Value) -> Option<LineItemFragment> {
    if !raw.is_object() {
        return None;
    }

    Some(LineItemFragment {
        article_code: item_string(raw, ItemField::ArticleCode),
        barcode: item_string(raw, ItemField::Barcode),
        description: item_string(raw, ItemField::Description),
        quantity: item_decimal(raw, ItemField::Quantity),
        uom: item_string(raw, ItemField::Uom),
        unit_price: item_decimal(raw, ItemField::UnitPrice),
        line_total: item_decimal(raw, ItemField::LineTotal),
    })
}

/// First alias present in the object, regardless of value.
fn lookup<'a>(obj: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|key| obj.get(key))
        .filter(|v| !v.is_null())
}

fn string_field(obj: &Value, field: DocField) -> Option<String> {
    lookup(obj, field.aliases()).and_then(value_to_clean_string)
}

fn item_string(obj: &Value, field: ItemField) -> Option<String> {
    lookup(obj, field.aliases()).and_then(value_to_clean_string)
}

fn item_decimal(obj: &Value, field: ItemField) -> Option<rust_decimal::Decimal> {
    lookup(obj, field.aliases()).and_then(coerce_decimal)
}

/// Convert a scalar to a trimmed string, mapping null-ish sentinels the
/// extractor is known to emit to `None`.
fn value_to_clean_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if is_null_sentinel(&s) {
        None
    } else {
        Some(s)
    }
}

/// Sentinel strings that mean "no value".
pub fn is_null_sentinel(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "" | "null" | "none" | "na" | "n/a" | "unknown"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_adapt_full_candidate() {
        let raw = json!({
            "document_type": "Purchase Order",
            "retailer": "MYDIN",
            "po_number": "12345",
            "po_date": "2024-03-15",
            "currency": null,
            "total_amount": "MYR 1,250.00",
            "delivery_address": "Jalan Putrajaya",
            "items": [
                {"article_code": "A1", "qty": "10", "unit_price": 2.5, "total_price": "25.00"},
                {"Barcode": "955", "Quantity": 3}
            ]
        });

        let frag = adapt_candidate(&raw, 2).unwrap();
        assert_eq!(frag.retailer.as_deref(), Some("MYDIN"));
        assert_eq!(frag.po_number.as_deref(), Some("12345"));
        assert_eq!(frag.currency.as_deref(), Some("MYR"));
        assert_eq!(frag.total_amount, Some(Decimal::from_str("1250.00").unwrap()));
        assert_eq!(frag.page_index, 2);
        assert_eq!(frag.items.len(), 2);
        assert_eq!(frag.items[0].quantity, Some(Decimal::from(10)));
        assert_eq!(frag.items[1].barcode.as_deref(), Some("955"));
        assert_eq!(frag.items[1].quantity, Some(Decimal::from(3)));
    }

    #[test]
    fn test_alias_order_wins() {
        // "qty" comes before "Quantity" in the alias list.
        let raw = json!({"retailer": "X", "items": [{"qty": 1, "Quantity": 9}]});
        let frag = adapt_candidate(&raw, 0).unwrap();
        assert_eq!(frag.items[0].quantity, Some(Decimal::from(1)));
    }

    #[test]
    fn test_null_sentinels_dropped() {
        let raw = json!({"retailer": "unknown", "po_number": "null", "branch_name": "N/A"});
        let frag = adapt_candidate(&raw, 0).unwrap();
        assert_eq!(frag.retailer, None);
        assert_eq!(frag.po_number, None);
        assert_eq!(frag.branch_name, None);
    }

    #[test]
    fn test_non_object_candidate_skipped() {
        assert!(adapt_candidate(&json!("garbage"), 0).is_none());
        assert!(adapt_candidate(&json!(42), 0).is_none());
    }

    #[test]
    fn test_uncoercible_numbers_stay_empty() {
        let raw = json!({"retailer": "X", "total_amount": "tbd", "items": [{"qty": "many"}]});
        let frag = adapt_candidate(&raw, 0).unwrap();
        assert_eq!(frag.total_amount, None);
        assert_eq!(frag.items[0].quantity, None);
    }
}
