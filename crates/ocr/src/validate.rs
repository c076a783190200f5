use rust_decimal::Decimal;

use divvy_core::Money;

use crate::types::ParsedItem;

/// Fixed absolute tolerance between the computed subtotal and the total
/// printed on the ticket, absorbing rounding and OCR noise in that line.
pub fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Structural sanity check for a parsed item list, optionally reconciled
/// against the ticket's printed total. Pure: no mutation, no I/O.
///
/// Fails on an empty list or any non-positive price. When `expected_total`
/// is present, passes only if the item sum lands within [`tolerance`] of it.
pub fn validate_items(items: &[ParsedItem], expected_total: Option<Decimal>) -> bool {
    if items.is_empty() {
        return false;
    }
    if items.iter().any(|item| !item.price.is_positive()) {
        return false;
    }
    match expected_total {
        Some(expected) => {
            let subtotal: Money = items.iter().map(|item| item.price).sum();
            (subtotal.as_decimal() - expected).abs() <= tolerance()
        }
        None => true,
    }
}
