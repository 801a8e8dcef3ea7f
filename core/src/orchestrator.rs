//! The simulation orchestrator. Ties catalog, eligibility, amortization,
//! persistence and notification together.
//!
//! SIMULATE ORDER (fixed):
//!   1. Load the catalog snapshot (TTL cache).
//!   2. Pick the best eligible product; none → NoEligibleProduct.
//!   3. Compute SAC and PRICE schedules at the product's rate.
//!   4. Derive average installment and total credit from PRICE.
//!   5. Persist the summary. A failed write fails the whole call.
//!   6. Hand the response to the notification retrier (never fails).
//!   7. Return id, product and both schedules.
//!
//! Schedules are never stored. Reads re-derive them from the summary and
//! whatever product the *current* catalog resolves the (amount, term) to,
//! so a catalog change can alter what a historical read returns.

use crate::{
    amortization::{compute_schedule, AmortizationMethod, AmortizationResult},
    catalog_cache::{CatalogSnapshot, ProductCatalogCache},
    clock::{Clock, SystemClock},
    config::LoanConfig,
    eligibility::{resolve_for_simulation, select_best},
    error::{LoanError, LoanResult},
    notification::{FileSink, LogSink, NotificationEnvelope, NotificationRetrier, NotificationSink},
    product::Product,
    repository::{ProductSource, SimulationRepository},
    simulation::{
        DailyProductEntry, DailyProductReport, NewSimulation, ProductRef, Simulation,
        SimulationDetail, SimulationPage, SimulationRequest, SimulationResponse, SimulationSummary,
    },
    store::SimStore,
    types::{round_money, round_rate, ProductCode, SimulationId},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock},
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Product codes of one catalog generation, for existence checks.
struct ProductIndex {
    generation: u64,
    codes:      HashSet<ProductCode>,
}

pub struct SimulationOrchestrator {
    catalog:       ProductCatalogCache,
    repository:    Arc<dyn SimulationRepository>,
    notifier:      NotificationRetrier,
    clock:         Arc<dyn Clock>,
    product_index: RwLock<Option<ProductIndex>>,
    max_page_size: u32,
}

impl SimulationOrchestrator {
    pub fn new(
        catalog: ProductCatalogCache,
        repository: Arc<dyn SimulationRepository>,
        notifier: NotificationRetrier,
        clock: Arc<dyn Clock>,
        max_page_size: u32,
    ) -> Self {
        Self {
            catalog,
            repository,
            notifier,
            clock,
            product_index: RwLock::new(None),
            max_page_size: max_page_size.max(1),
        }
    }

    /// Build a fully wired orchestrator over one store, which serves as
    /// both the simulation repository and the product source. The store's
    /// product table is replaced with the configured catalog.
    pub fn build(config: &LoanConfig, store: Arc<SimStore>) -> LoanResult<Self> {
        store.replace_products(&config.products)?;

        let sink: Arc<dyn NotificationSink> = match &config.settings.notification.outbox_path {
            Some(path) => Arc::new(FileSink::new(path)),
            None => Arc::new(LogSink),
        };

        Ok(Self::with_collaborators(
            config,
            store.clone(),
            store,
            sink,
            Arc::new(SystemClock),
        ))
    }

    /// Wire explicit collaborators. Used by `build` and by tests that need
    /// a scripted sink, clock or product source.
    pub fn with_collaborators(
        config: &LoanConfig,
        products: Arc<dyn ProductSource>,
        repository: Arc<dyn SimulationRepository>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = ProductCatalogCache::new(products, config.catalog_ttl());
        let notifier = NotificationRetrier::new(
            sink,
            config.retry_policy(),
            config.settings.notification.dispatch,
        );
        Self::new(catalog, repository, notifier, clock, config.settings.max_page_size)
    }

    /// In-memory store seeded with `LoanConfig::default_test()`.
    pub fn build_test() -> LoanResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        Self::build(&LoanConfig::default_test(), Arc::new(store))
    }

    pub fn catalog(&self) -> &ProductCatalogCache {
        &self.catalog
    }

    /// Wait for background notifications still retrying.
    pub fn flush_notifications(&self) {
        self.notifier.flush();
    }

    /// Current catalog products, in catalog order.
    pub fn products(&self) -> LoanResult<Vec<Product>> {
        Ok(self.catalog.get()?.products.clone())
    }

    // ── simulate ───────────────────────────────────────────────

    pub fn simulate(&self, request: SimulationRequest) -> LoanResult<SimulationResponse> {
        validate_request(&request)?;
        let amount = round_money(request.amount);
        let term = request.term;

        let snapshot = self.catalog.get()?;
        let product = select_best(&snapshot.products, amount, term)
            .ok_or(LoanError::NoEligibleProduct { amount, term })?;

        let schedules = schedules_for(amount, term, product.monthly_rate)?;
        let price = schedules
            .iter()
            .find(|s| s.method == AmortizationMethod::Price)
            .ok_or_else(|| anyhow::anyhow!("PRICE schedule missing"))?;
        let (average_installment, total_credit) = price_summary(price)?;

        let record = NewSimulation {
            amount,
            term,
            average_rate: round_rate(product.monthly_rate),
            average_installment,
            total_credit,
            created_at: self.clock.now(),
        };
        let simulation_id = self.repository.persist(&record)?;

        log::info!(
            "orchestrator: simulation {simulation_id} amount={amount} term={term} product={}",
            product.code
        );

        let response = SimulationResponse {
            simulation_id,
            product: ProductRef::from(product),
            schedules,
        };

        let outcome = self
            .notifier
            .send(&NotificationEnvelope::new(response.clone(), record.created_at));
        log::debug!("orchestrator: notification for {simulation_id}: {outcome:?}");

        Ok(response)
    }

    // ── get_by_id ──────────────────────────────────────────────

    pub fn get_by_id(&self, id: SimulationId) -> LoanResult<SimulationDetail> {
        let simulation = self
            .repository
            .find_by_id(id)?
            .ok_or(LoanError::SimulationNotFound { id })?;

        let snapshot = self.catalog.get()?;
        let resolved = resolve_for_simulation(&snapshot.products, simulation.amount, simulation.term);

        let (product, schedules) = match resolved {
            Some(p) => (
                Some(ProductRef::from(p)),
                schedules_for(simulation.amount, simulation.term, p.monthly_rate)?,
            ),
            None => {
                log::warn!(
                    "orchestrator: simulation {id} no longer matches any product; returning without schedules"
                );
                (None, Vec::new())
            }
        };

        Ok(SimulationDetail { simulation, product, schedules })
    }

    // ── list ───────────────────────────────────────────────────

    /// `page` is 1-based.
    pub fn list(&self, page: u32, page_size: u32) -> LoanResult<SimulationPage> {
        if page == 0 {
            return Err(LoanError::invalid_parameter("page", "must be at least 1"));
        }
        if page_size == 0 || page_size > self.max_page_size {
            return Err(LoanError::invalid_parameter(
                "page_size",
                format!("must be between 1 and {}", self.max_page_size),
            ));
        }

        let total_count = self.repository.count()?;
        let items = self
            .repository
            .page(page - 1, page_size)?
            .iter()
            .map(SimulationSummary::from)
            .collect();

        Ok(SimulationPage { page, page_size, total_count, items })
    }

    // ── query_by_product_and_date ──────────────────────────────

    pub fn query_by_product_and_date(
        &self,
        date_filter: Option<&str>,
        product_code: Option<ProductCode>,
    ) -> LoanResult<DailyProductReport> {
        let date = match date_filter {
            Some(raw) => parse_reference_date(raw)?,
            None => self.clock.today(),
        };

        let snapshot = self.catalog.get()?;
        if let Some(code) = product_code {
            if !self.product_exists(&snapshot, code) {
                return Err(LoanError::ProductNotFound { product_code: code });
            }
        }

        let entries = self
            .repository
            .list_all()?
            .into_iter()
            .filter(|s| s.created_at.date() == date)
            .filter_map(|s| {
                let product = resolve_for_simulation(&snapshot.products, s.amount, s.term)?;
                match product_code {
                    Some(code) if code != product.code => None,
                    _ => Some(daily_entry(&s, product)),
                }
            })
            .collect();

        Ok(DailyProductReport {
            reference_date: date.format(DATE_FORMAT).to_string(),
            entries,
        })
    }

    /// Existence check through a code index rebuilt once per catalog
    /// generation.
    fn product_exists(&self, snapshot: &CatalogSnapshot, code: ProductCode) -> bool {
        {
            let index = self.product_index.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(idx) = index.as_ref().filter(|i| i.generation == snapshot.generation) {
                return idx.codes.contains(&code);
            }
        }

        let mut index = self.product_index.write().unwrap_or_else(PoisonError::into_inner);
        let stale = index
            .as_ref()
            .map_or(true, |i| i.generation != snapshot.generation);
        if stale {
            *index = Some(ProductIndex {
                generation: snapshot.generation,
                codes:      snapshot.products.iter().map(|p| p.code).collect(),
            });
        }
        index.as_ref().is_some_and(|i| i.codes.contains(&code))
    }
}

fn validate_request(request: &SimulationRequest) -> LoanResult<()> {
    if request.amount <= Decimal::ZERO {
        return Err(LoanError::invalid_parameter("amount", "must be greater than zero"));
    }
    if request.term == 0 {
        return Err(LoanError::invalid_parameter("term", "must be greater than zero"));
    }
    Ok(())
}

fn schedules_for(amount: Decimal, term: u32, rate: Decimal) -> LoanResult<Vec<AmortizationResult>> {
    AmortizationMethod::ALL
        .iter()
        .map(|&method| compute_schedule(amount, rate, term, method))
        .collect()
}

/// (average installment, total credit), each rounded half-up to cents.
fn price_summary(price: &AmortizationResult) -> LoanResult<(Decimal, Decimal)> {
    let total = price.total_installments()?;
    let count = Decimal::from(price.lines.len().max(1) as u64);
    Ok((round_money(total / count), round_money(total)))
}

/// Strict `YYYY-MM-DD`: exactly ten characters, zero-padded.
pub fn parse_reference_date(raw: &str) -> LoanResult<NaiveDate> {
    let invalid = || LoanError::InvalidDateFormat { value: raw.to_string() };
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())
}

fn daily_entry(simulation: &Simulation, product: &Product) -> DailyProductEntry {
    DailyProductEntry {
        simulation_id:       simulation.id,
        product_code:        product.code,
        product_name:        product.name.clone(),
        average_rate:        simulation.average_rate,
        average_installment: simulation.average_installment,
        amount:              simulation.amount,
        total_credit:        simulation.total_credit,
    }
}
