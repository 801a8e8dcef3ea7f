use super::{decimal_at, term_at, SimStore};
use crate::{
    error::LoanResult,
    repository::SimulationRepository,
    simulation::{NewSimulation, Simulation},
    types::SimulationId,
};
use rusqlite::{params, OptionalExtension, Row};

const SIMULATION_COLUMNS: &str =
    "id, amount, term, average_rate, average_installment, total_credit, created_at";

fn simulation_from_row(row: &Row<'_>) -> rusqlite::Result<Simulation> {
    Ok(Simulation {
        id:                  row.get(0)?,
        amount:              decimal_at(row, 1)?,
        term:                term_at(row, 2)?,
        average_rate:        decimal_at(row, 3)?,
        average_installment: decimal_at(row, 4)?,
        total_credit:        decimal_at(row, 5)?,
        created_at:          row.get(6)?,
    })
}

impl SimulationRepository for SimStore {
    fn persist(&self, sim: &NewSimulation) -> LoanResult<SimulationId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO simulation (
                amount, term, average_rate, average_installment, total_credit, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                sim.amount.to_string(),
                sim.term,
                sim.average_rate.to_string(),
                sim.average_installment.to_string(),
                sim.total_credit.to_string(),
                sim.created_at,
            ],
        )?;
        let id = conn.last_insert_rowid();
        log::debug!("store: simulation {id} persisted");
        Ok(id)
    }

    fn find_by_id(&self, id: SimulationId) -> LoanResult<Option<Simulation>> {
        let conn = self.conn();
        let found = conn
            .query_row(
                &format!("SELECT {SIMULATION_COLUMNS} FROM simulation WHERE id = ?1"),
                params![id],
                simulation_from_row,
            )
            .optional()?;
        Ok(found)
    }

    fn list_all(&self) -> LoanResult<Vec<Simulation>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {SIMULATION_COLUMNS} FROM simulation ORDER BY id ASC"))?;
        let rows = stmt
            .query_map([], simulation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count(&self) -> LoanResult<u64> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM simulation", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn page(&self, page_index: u32, page_size: u32) -> LoanResult<Vec<Simulation>> {
        let offset = i64::from(page_index) * i64::from(page_size);
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SIMULATION_COLUMNS} FROM simulation
             ORDER BY id ASC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(params![i64::from(page_size), offset], simulation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
