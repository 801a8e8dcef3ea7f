//! Product eligibility: which catalog products may be offered for an
//! (amount, term) pair, and which one wins.
//!
//! RULES:
//!   - Bounds are inclusive; an absent bound is unbounded.
//!   - The winner is the lowest monthly rate. Ties go to the product that
//!     appears first in catalog order.
//!   - "Nothing eligible" is not an error here. Callers decide.

use crate::product::Product;
use rust_decimal::Decimal;

pub fn filter_eligible(products: &[Product], amount: Decimal, term: u32) -> Vec<&Product> {
    products
        .iter()
        .filter(|p| p.is_eligible(amount, term))
        .collect()
}

pub fn select_best(products: &[Product], amount: Decimal, term: u32) -> Option<&Product> {
    // Strict `<` keeps the earliest product on ties.
    products
        .iter()
        .filter(|p| p.is_eligible(amount, term))
        .fold(None, |best: Option<&Product>, candidate| match best {
            Some(current) if current.monthly_rate <= candidate.monthly_rate => Some(current),
            _ => Some(candidate),
        })
}

/// Reverse lookup for a persisted simulation against the current catalog.
///
/// This is `select_best` re-applied. If the catalog changed since the
/// simulation was created the answer may differ from the original choice.
pub fn resolve_for_simulation(
    products: &[Product],
    amount: Decimal,
    term: u32,
) -> Option<&Product> {
    select_best(products, amount, term)
}
