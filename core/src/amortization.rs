//! Amortization engine: SAC and PRICE installment schedules.
//!
//! Pure computation: no state, no I/O. All arithmetic is fixed-point
//! (`Decimal`), money at 2 places and rates at 4, rounded half-up.
//!
//! SAC:   constant amortization, declining interest and installment.
//! PRICE: constant installment, interest on the outstanding balance,
//!        amortization is the remainder.
//!
//! Every line's interest is round(balance × rate). Rounding residue is
//! never corrected, so the final balance of either method may miss zero
//! by a few cents.
//!
//! Overflow anywhere in a schedule is an `InvalidParameter`, never a panic.

use crate::{
    error::{LoanError, LoanResult},
    types::{round_money, round_rate},
};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

const MIN_AMORTIZATION: Decimal = dec!(0.01);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AmortizationMethod {
    Sac,
    Price,
}

impl AmortizationMethod {
    pub const ALL: [AmortizationMethod; 2] = [AmortizationMethod::Sac, AmortizationMethod::Price];

    pub fn tag(self) -> &'static str {
        match self {
            AmortizationMethod::Sac   => "SAC",
            AmortizationMethod::Price => "PRICE",
        }
    }
}

impl fmt::Display for AmortizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AmortizationMethod {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAC"   => Ok(AmortizationMethod::Sac),
            "PRICE" => Ok(AmortizationMethod::Price),
            _ => Err(LoanError::InvalidAmortizationMethod { method: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentLine {
    pub number:       u32,
    pub amortization: Decimal,
    pub interest:     Decimal,
    pub installment:  Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationResult {
    pub method: AmortizationMethod,
    pub lines:  Vec<InstallmentLine>,
}

impl AmortizationResult {
    pub fn total_installments(&self) -> LoanResult<Decimal> {
        checked_sum(self.lines.iter().map(|l| l.installment))
    }

    pub fn total_amortization(&self) -> LoanResult<Decimal> {
        checked_sum(self.lines.iter().map(|l| l.amortization))
    }
}

fn checked_sum(mut values: impl Iterator<Item = Decimal>) -> LoanResult<Decimal> {
    values
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| overflow("schedule total"))
}

fn overflow(what: &str) -> LoanError {
    LoanError::invalid_parameter("principal", format!("{what} overflows"))
}

/// Compute the full schedule for one method.
pub fn compute_schedule(
    principal: Decimal,
    monthly_rate: Decimal,
    term: u32,
    method: AmortizationMethod,
) -> LoanResult<AmortizationResult> {
    if principal <= Decimal::ZERO {
        return Err(LoanError::invalid_parameter("principal", "must be greater than zero"));
    }
    if term == 0 {
        return Err(LoanError::invalid_parameter("term", "must be greater than zero"));
    }
    if monthly_rate < Decimal::ZERO {
        return Err(LoanError::invalid_parameter("monthly_rate", "must not be negative"));
    }

    let principal = round_money(principal);
    // Below one cent per period the rounded amortization collapses to zero.
    if principal < MIN_AMORTIZATION * Decimal::from(term) {
        return Err(LoanError::invalid_parameter(
            "principal",
            format!("{principal} is too small to amortize over {term} months"),
        ));
    }
    let rate = round_rate(monthly_rate);

    let lines = match method {
        AmortizationMethod::Sac   => sac_lines(principal, rate, term)?,
        AmortizationMethod::Price => price_lines(principal, rate, term)?,
    };

    Ok(AmortizationResult { method, lines })
}

/// Parse the method tag first, then compute. Unknown tags fail with
/// `InvalidAmortizationMethod`.
pub fn compute_schedule_for_tag(
    principal: Decimal,
    monthly_rate: Decimal,
    term: u32,
    method: &str,
) -> LoanResult<AmortizationResult> {
    let method = method.parse::<AmortizationMethod>()?;
    compute_schedule(principal, monthly_rate, term, method)
}

fn sac_lines(principal: Decimal, rate: Decimal, term: u32) -> LoanResult<Vec<InstallmentLine>> {
    let amortization = round_money(principal / Decimal::from(term));
    let mut balance = principal;
    let mut lines = Vec::with_capacity(term as usize);

    for number in 1..=term {
        let interest = interest_on(balance, rate)?;
        let installment = amortization
            .checked_add(interest)
            .ok_or_else(|| overflow("installment"))?;
        balance -= amortization;
        lines.push(InstallmentLine { number, amortization, interest, installment });
    }

    Ok(lines)
}

fn price_lines(principal: Decimal, rate: Decimal, term: u32) -> LoanResult<Vec<InstallmentLine>> {
    let installment = price_installment(principal, rate, term)?;
    let mut balance = principal;
    let mut lines = Vec::with_capacity(term as usize);

    for number in 1..=term {
        let interest = interest_on(balance, rate)?;
        let amortization = installment
            .checked_sub(interest)
            .ok_or_else(|| overflow("amortization"))?;
        balance = balance
            .checked_sub(amortization)
            .ok_or_else(|| overflow("outstanding balance"))?;
        lines.push(InstallmentLine { number, amortization, interest, installment });
    }

    Ok(lines)
}

fn interest_on(balance: Decimal, rate: Decimal) -> LoanResult<Decimal> {
    balance
        .checked_mul(rate)
        .map(round_money)
        .ok_or_else(|| overflow("interest"))
}

/// Fixed annuity installment: P·r·(1+r)^n / ((1+r)^n − 1), or P/n at r = 0.
pub fn price_installment(principal: Decimal, rate: Decimal, term: u32) -> LoanResult<Decimal> {
    if rate.is_zero() {
        return Ok(round_money(principal / Decimal::from(term)));
    }

    let factor = (Decimal::ONE + rate)
        .checked_powu(u64::from(term))
        .ok_or_else(|| {
            LoanError::invalid_parameter("term", format!("compound factor overflows at {term} months"))
        })?;

    let numerator = principal
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(factor))
        .ok_or_else(|| overflow("installment"))?;

    numerator
        .checked_div(factor - Decimal::ONE)
        .map(round_money)
        .ok_or_else(|| overflow("installment"))
}
