use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::types::{ProductCode, SimulationId};

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Unknown amortization method '{method}' (expected SAC or PRICE)")]
    InvalidAmortizationMethod { method: String },

    #[error("No eligible product for amount {amount} over {term} months")]
    NoEligibleProduct { amount: Decimal, term: u32 },

    #[error("Product {product_code} not found in catalog")]
    ProductNotFound { product_code: ProductCode },

    #[error("Simulation {id} not found")]
    SimulationNotFound { id: SimulationId },

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDateFormat { value: String },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Product catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type LoanResult<T> = Result<T, LoanError>;

/// Structured error shape handed to whatever boundary serves the core.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code:    &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail:  Option<String>,
    pub status:  u16,
}

impl LoanError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        LoanError::InvalidParameter { name, reason: reason.into() }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            LoanError::InvalidAmortizationMethod { .. } => "INVALID_AMORTIZATION_METHOD",
            LoanError::NoEligibleProduct { .. }         => "NO_ELIGIBLE_PRODUCT",
            LoanError::ProductNotFound { .. }           => "PRODUCT_NOT_FOUND",
            LoanError::SimulationNotFound { .. }        => "SIMULATION_NOT_FOUND",
            LoanError::InvalidDateFormat { .. }         => "INVALID_DATE_FORMAT",
            LoanError::InvalidParameter { .. }          => "INVALID_PARAMETER",
            LoanError::CatalogUnavailable { .. }        => "CATALOG_UNAVAILABLE",
            LoanError::Database(_)                      => "DATABASE_ERROR",
            LoanError::Serialization(_)                 => "SERIALIZATION_ERROR",
            LoanError::Other(_)                         => "INTERNAL_ERROR",
        }
    }

    /// HTTP-equivalent status for this kind.
    pub fn status(&self) -> u16 {
        match self {
            LoanError::InvalidAmortizationMethod { .. }
            | LoanError::InvalidDateFormat { .. }
            | LoanError::InvalidParameter { .. } => 400,
            LoanError::ProductNotFound { .. }
            | LoanError::SimulationNotFound { .. } => 404,
            LoanError::NoEligibleProduct { .. } => 422,
            LoanError::CatalogUnavailable { .. } => 503,
            LoanError::Database(_)
            | LoanError::Serialization(_)
            | LoanError::Other(_) => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let detail = match self {
            LoanError::NoEligibleProduct { amount, term } => {
                Some(format!("amount={amount} term={term}"))
            }
            LoanError::InvalidParameter { name, .. } => Some(format!("parameter={name}")),
            LoanError::InvalidDateFormat { value } => Some(format!("value={value}")),
            LoanError::Database(e) => Some(e.to_string()),
            _ => None,
        };
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
            detail,
            status: self.status(),
        }
    }
}
