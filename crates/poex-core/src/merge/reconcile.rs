//! Declared-total vs item-sum reconciliation.
//!
//! Extraction errors show up as a gap between the declared grand total and
//! the sum of line totals. The gap is a review signal, not a hard failure:
//! a flagged document is still persisted, downstream users see the reason.

use rust_decimal::Decimal;

use crate::models::fragment::LineItemFragment;

/// Outcome of reconciling one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Within tolerance, or not checkable (no positive declared total).
    Consistent,
    /// Absolute difference at or above tolerance.
    Flagged { difference: Decimal, reason: String },
}

impl Reconciliation {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Reconciliation::Flagged { .. })
    }
}

/// Compare the declared total against the sum of item line totals.
///
/// A missing or zero declared total means the grand total failed
/// extraction; that document is not checkable and passes. A positive
/// declared total is always checked, even against an empty item sum.
pub fn reconcile(
    declared_total: Decimal,
    items: &[LineItemFragment],
    tolerance: Decimal,
) -> Reconciliation {
    if declared_total <= Decimal::ZERO {
        return Reconciliation::Consistent;
    }

    let item_sum: Decimal = items.iter().filter_map(|i| i.line_total).sum();
    let difference = (declared_total - item_sum).abs();
    if difference < tolerance {
        return Reconciliation::Consistent;
    }

    Reconciliation::Flagged {
        difference,
        reason: format!(
            "total {:.2} differs from item sum {:.2} by {:.2}",
            declared_total, item_sum, difference
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn item(line_total: Option<&str>) -> LineItemFragment {
        LineItemFragment {
            line_total: line_total.map(|s| Decimal::from_str(s).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_within_tolerance_passes() {
        // Sum 100.00, declared 100.99: difference 0.99 < 1.00.
        let items = vec![item(Some("60.00")), item(Some("40.00"))];
        let r = reconcile(Decimal::from_str("100.99").unwrap(), &items, Decimal::ONE);
        assert_eq!(r, Reconciliation::Consistent);
    }

    #[test]
    fn test_beyond_tolerance_flags() {
        // Sum 100.00, declared 98.99: difference 1.01 > 1.00.
        let items = vec![item(Some("60.00")), item(Some("40.00"))];
        let r = reconcile(Decimal::from_str("98.99").unwrap(), &items, Decimal::ONE);
        match r {
            Reconciliation::Flagged { difference, reason } => {
                assert_eq!(difference, Decimal::from_str("1.01").unwrap());
                assert!(reason.contains("1.01"), "reason: {reason}");
            }
            other => panic!("expected flag, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_tolerance_difference_flags() {
        // Sum 100.00, declared 99.00: difference of exactly 1.00 flags.
        let items = vec![item(Some("100.00"))];
        let r = reconcile(Decimal::from_str("99.00").unwrap(), &items, Decimal::ONE);
        match r {
            Reconciliation::Flagged { difference, .. } => {
                assert_eq!(difference, Decimal::ONE);
            }
            other => panic!("expected flag, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_declared_total_not_checkable() {
        let items = vec![item(Some("60.00")), item(Some("40.00"))];
        let r = reconcile(Decimal::ZERO, &items, Decimal::ONE);
        assert_eq!(r, Reconciliation::Consistent);
    }

    #[test]
    fn test_positive_total_against_empty_item_sum_flags() {
        let items = vec![item(None), item(None)];
        let r = reconcile(Decimal::from_str("500.00").unwrap(), &items, Decimal::ONE);
        assert!(r.is_flagged());
    }

    #[test]
    fn test_partial_line_totals_still_checked() {
        let items = vec![item(Some("10.00")), item(None)];
        let r = reconcile(Decimal::from_str("50.00").unwrap(), &items, Decimal::ONE);
        assert!(r.is_flagged());
    }
}
