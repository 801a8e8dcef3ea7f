//! Loan products as loaded from the catalog.

use crate::types::ProductCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog entry. Absent bounds are unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code:         ProductCode,
    pub name:         String,
    /// Monthly interest rate, 4-decimal scale.
    pub monthly_rate: Decimal,
    #[serde(default)]
    pub min_term:     Option<u32>,
    #[serde(default)]
    pub max_term:     Option<u32>,
    #[serde(default)]
    pub min_amount:   Option<Decimal>,
    #[serde(default)]
    pub max_amount:   Option<Decimal>,
}

impl Product {
    /// Inclusive check against the principal range.
    pub fn accepts_amount(&self, amount: Decimal) -> bool {
        self.min_amount.map_or(true, |min| amount >= min)
            && self.max_amount.map_or(true, |max| amount <= max)
    }

    /// Inclusive check against the term range.
    pub fn accepts_term(&self, term: u32) -> bool {
        self.min_term.map_or(true, |min| term >= min)
            && self.max_term.map_or(true, |max| term <= max)
    }

    pub fn is_eligible(&self, amount: Decimal, term: u32) -> bool {
        self.accepts_amount(amount) && self.accepts_term(term)
    }
}
