//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use loansim_core::{
    clock::FixedClock,
    config::LoanConfig,
    notification::NotificationSink,
    store::SimStore,
    Product, SimulationOrchestrator,
};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

pub fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(hh, mm, 0))
        .expect("valid timestamp")
}

pub fn product(code: i64, rate: Decimal) -> Product {
    Product {
        code,
        name: format!("Produto {code}"),
        monthly_rate: rate,
        min_term: None,
        max_term: None,
        min_amount: None,
        max_amount: None,
    }
}

pub fn migrated_store() -> Arc<SimStore> {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    Arc::new(store)
}

/// Records every payload it is handed.
#[derive(Default)]
pub struct RecordingSink {
    pub payloads: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, payload: &str) -> anyhow::Result<()> {
        self.payloads.lock().unwrap().push(payload.to_string());
        Ok(())
    }
}

/// Always fails.
#[derive(Default)]
pub struct BrokenSink {
    pub calls: Mutex<u32>,
}

impl NotificationSink for BrokenSink {
    fn deliver(&self, _payload: &str) -> anyhow::Result<()> {
        *self.calls.lock().unwrap() += 1;
        anyhow::bail!("sink offline")
    }
}

/// Orchestrator over an in-memory store seeded with `config.products`,
/// pinned to `now`.
pub fn orchestrator_at(
    config: &LoanConfig,
    now: NaiveDateTime,
    sink: Arc<dyn NotificationSink>,
) -> (SimulationOrchestrator, Arc<SimStore>) {
    let store = migrated_store();
    store.replace_products(&config.products).expect("seed products");
    let orchestrator = SimulationOrchestrator::with_collaborators(
        config,
        store.clone(),
        store.clone(),
        sink,
        Arc::new(FixedClock::new(now)),
    );
    (orchestrator, store)
}
