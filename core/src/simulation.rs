//! Simulation records and the response shapes built from them.

use crate::{
    amortization::AmortizationResult,
    product::Product,
    types::{ProductCode, SimulationId},
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub amount: Decimal,
    pub term:   u32,
}

/// Summary fields written by `simulate`, before an id exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSimulation {
    pub amount:              Decimal,
    pub term:                u32,
    pub average_rate:        Decimal,
    pub average_installment: Decimal,
    pub total_credit:        Decimal,
    pub created_at:          NaiveDateTime,
}

/// A persisted simulation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulation {
    pub id:                  SimulationId,
    pub amount:              Decimal,
    pub term:                u32,
    pub average_rate:        Decimal,
    pub average_installment: Decimal,
    pub total_credit:        Decimal,
    pub created_at:          NaiveDateTime,
}

impl Simulation {
    pub fn from_new(id: SimulationId, new: NewSimulation) -> Self {
        Self {
            id,
            amount:              new.amount,
            term:                new.term,
            average_rate:        new.average_rate,
            average_installment: new.average_installment,
            total_credit:        new.total_credit,
            created_at:          new.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub code:         ProductCode,
    pub name:         String,
    pub monthly_rate: Decimal,
}

impl From<&Product> for ProductRef {
    fn from(p: &Product) -> Self {
        Self {
            code:         p.code,
            name:         p.name.clone(),
            monthly_rate: p.monthly_rate,
        }
    }
}

/// Result of a successful `simulate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub simulation_id: SimulationId,
    pub product:       ProductRef,
    pub schedules:     Vec<AmortizationResult>,
}

impl SimulationResponse {
    pub fn schedule(&self, method: crate::amortization::AmortizationMethod) -> Option<&AmortizationResult> {
        self.schedules.iter().find(|s| s.method == method)
    }
}

/// `get_by_id` result. `product` is None and `schedules` empty when no
/// product in the current catalog matches the stored amount and term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationDetail {
    pub simulation: Simulation,
    pub product:    Option<ProductRef>,
    pub schedules:  Vec<AmortizationResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub id:           SimulationId,
    pub amount:       Decimal,
    pub term:         u32,
    pub total_credit: Decimal,
}

impl From<&Simulation> for SimulationSummary {
    fn from(s: &Simulation) -> Self {
        Self {
            id:           s.id,
            amount:       s.amount,
            term:         s.term,
            total_credit: s.total_credit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationPage {
    pub page:        u32,
    pub page_size:   u32,
    pub total_count: u64,
    pub items:       Vec<SimulationSummary>,
}

/// One simulation of the reference day, tagged with the product it
/// resolves to in the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyProductEntry {
    pub simulation_id:       SimulationId,
    pub product_code:        ProductCode,
    pub product_name:        String,
    pub average_rate:        Decimal,
    pub average_installment: Decimal,
    pub amount:              Decimal,
    pub total_credit:        Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyProductReport {
    /// `YYYY-MM-DD`.
    pub reference_date: String,
    pub entries:        Vec<DailyProductEntry>,
}
