//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The orchestrator goes through SimulationRepository / ProductSource and
//! never executes SQL directly.

mod product;
mod simulation;

use crate::error::LoanResult;
use rusqlite::{types::Type, Connection, Row};
use rust_decimal::Decimal;
use std::{
    str::FromStr,
    sync::{Mutex, MutexGuard, PoisonError},
};

pub struct SimStore {
    conn: Mutex<Connection>,
}

impl SimStore {
    pub fn open(path: &str) -> LoanResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Private in-memory database; gone when the store is dropped.
    pub fn in_memory() -> LoanResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LoanResult<()> {
        let conn = self.conn();
        conn.execute_batch(include_str!("../../../migrations/001_products.sql"))?;
        conn.execute_batch(include_str!("../../../migrations/002_simulations.sql"))?;
        Ok(())
    }

    /// Poisoned locks are recovered; SQLite state survives a panicked caller.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Column helpers ─────────────────────────────────────────────

fn parse_decimal(idx: usize, text: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    parse_decimal(idx, &text)
}

fn optional_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| parse_decimal(idx, &text))
        .transpose()
}

fn term_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn optional_term_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u32>> {
    row.get::<_, Option<i64>>(idx)?
        .map(|raw| {
            u32::try_from(raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
        })
        .transpose()
}
