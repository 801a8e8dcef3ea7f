//! Shared primitive types and fixed-point helpers.

use crate::error::{LoanError, LoanResult};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Identifier assigned by the repository when a simulation is persisted.
pub type SimulationId = i64;

/// Unique key of a catalog product.
pub type ProductCode = i64;

/// Decimal places carried by monetary values.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places carried by interest rates.
pub const RATE_SCALE: u32 = 4;

/// Round a monetary value half-up to cents.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a rate half-up to four decimal places.
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a principal typed by a caller ("10000", "10000.00").
pub fn parse_amount(raw: &str) -> LoanResult<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|_| LoanError::invalid_parameter("amount", format!("'{raw}' is not a decimal amount")))
}
