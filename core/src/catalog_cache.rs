//! Time-bounded read-through cache over the product source.
//!
//! RULES:
//!   - A snapshot is fresh while its age is below the TTL.
//!   - At most one reload runs at a time. Callers that lose the race get
//!     the stale snapshot instead of starting their own reload.
//!   - Only the very first load blocks concurrent callers, because there is
//!     nothing stale to hand out yet.
//!   - A failed reload keeps the previous snapshot in service.

use crate::{
    error::{LoanError, LoanResult},
    product::Product,
    repository::ProductSource,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError, RwLock, TryLockError,
    },
    time::{Duration, Instant},
};

pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
pub struct CatalogSnapshot {
    pub products:   Vec<Product>,
    pub loaded_at:  Instant,
    /// Increments on every successful reload.
    pub generation: u64,
}

impl CatalogSnapshot {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.loaded_at.elapsed() < ttl
    }
}

pub struct ProductCatalogCache {
    source:      Arc<dyn ProductSource>,
    ttl:         Duration,
    current:     RwLock<Option<Arc<CatalogSnapshot>>>,
    reload_gate: Mutex<()>,
    invalidated: AtomicBool,
}

impl ProductCatalogCache {
    pub fn new(source: Arc<dyn ProductSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(None),
            reload_gate: Mutex::new(()),
            invalidated: AtomicBool::new(false),
        }
    }

    /// Current catalog, reloading first if the snapshot has expired.
    pub fn get(&self) -> LoanResult<Arc<CatalogSnapshot>> {
        let existing = self.peek();
        if let Some(snapshot) = &existing {
            if self.is_usable(snapshot) {
                return Ok(Arc::clone(snapshot));
            }
        }

        let _gate = match self.reload_gate.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => match existing {
                Some(stale) => {
                    log::debug!("catalog: reload in flight, serving generation {}", stale.generation);
                    return Ok(stale);
                }
                None => self.reload_gate.lock().unwrap_or_else(PoisonError::into_inner),
            },
        };

        // Someone may have finished a reload while we waited for the gate.
        let existing = self.peek();
        if let Some(snapshot) = &existing {
            if self.is_usable(snapshot) {
                return Ok(Arc::clone(snapshot));
            }
        }

        self.reload(existing)
    }

    /// Force the next `get` to reload. The current products stay available
    /// to readers that race the reload.
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::Release);
    }

    fn is_usable(&self, snapshot: &CatalogSnapshot) -> bool {
        snapshot.is_fresh(self.ttl) && !self.invalidated.load(Ordering::Acquire)
    }

    fn peek(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Caller must hold the reload gate.
    fn reload(&self, previous: Option<Arc<CatalogSnapshot>>) -> LoanResult<Arc<CatalogSnapshot>> {
        // Cleared before loading so an invalidate() racing the load survives it.
        let was_invalidated = self.invalidated.swap(false, Ordering::AcqRel);
        match self.source.list_all() {
            Ok(products) => {
                let generation = previous.as_ref().map_or(1, |p| p.generation + 1);
                let snapshot = Arc::new(CatalogSnapshot {
                    products,
                    loaded_at: Instant::now(),
                    generation,
                });
                *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&snapshot));
                log::info!(
                    "catalog: loaded {} products (generation {generation})",
                    snapshot.products.len()
                );
                Ok(snapshot)
            }
            Err(e) => match previous {
                Some(stale) => {
                    if was_invalidated {
                        self.invalidated.store(true, Ordering::Release);
                    }
                    log::warn!(
                        "catalog: reload failed, keeping generation {}: {e}",
                        stale.generation
                    );
                    Ok(stale)
                }
                None => Err(LoanError::CatalogUnavailable { reason: e.to_string() }),
            },
        }
    }
}
