//! Collaborator contracts the orchestrator depends on.
//!
//! SimStore implements both against SQLite. Anything else that can persist
//! simulation summaries or list products may stand in.

use crate::{
    error::LoanResult,
    product::Product,
    simulation::{NewSimulation, Simulation},
    types::SimulationId,
};

pub trait SimulationRepository: Send + Sync {
    /// Record one simulation atomically and return its assigned id.
    fn persist(&self, simulation: &NewSimulation) -> LoanResult<SimulationId>;

    fn find_by_id(&self, id: SimulationId) -> LoanResult<Option<Simulation>>;

    /// Every stored simulation, ascending by id.
    fn list_all(&self) -> LoanResult<Vec<Simulation>>;

    fn count(&self) -> LoanResult<u64>;

    /// One page ascending by id. `page_index` is 0-based.
    fn page(&self, page_index: u32, page_size: u32) -> LoanResult<Vec<Simulation>>;
}

/// Read-only product catalog.
pub trait ProductSource: Send + Sync {
    fn list_all(&self) -> LoanResult<Vec<Product>>;
}
