//! Loan simulation core: product selection, SAC/PRICE schedules,
//! persistence of simulation summaries and best-effort notification.

pub mod amortization;
pub mod catalog_cache;
pub mod clock;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod notification;
pub mod orchestrator;
pub mod product;
pub mod repository;
pub mod simulation;
pub mod store;
pub mod types;

pub use amortization::{AmortizationMethod, AmortizationResult, InstallmentLine};
pub use error::{ErrorBody, LoanError, LoanResult};
pub use orchestrator::SimulationOrchestrator;
pub use product::Product;
pub use simulation::SimulationRequest;
