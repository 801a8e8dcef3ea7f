mod common;

use common::product;
use loansim_core::{
    catalog_cache::ProductCatalogCache,
    repository::ProductSource,
    LoanError, LoanResult, Product,
};
use rust_decimal_macros::dec;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Barrier, Mutex,
    },
    thread,
    time::Duration,
};

/// Counts loads; can be made slow or broken mid-test.
struct CountingSource {
    products: Mutex<Vec<Product>>,
    loads:    AtomicUsize,
    failing:  AtomicBool,
    delay:    Duration,
}

impl CountingSource {
    fn new(products: Vec<Product>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            products: Mutex::new(products),
            loads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay,
        })
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ProductSource for CountingSource {
    fn list_all(&self) -> LoanResult<Vec<Product>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("catalog database unreachable").into());
        }
        Ok(self.products.lock().unwrap().clone())
    }
}

const HOUR: Duration = Duration::from_secs(3600);

#[test]
fn fresh_snapshot_is_served_without_reloading() {
    let source = CountingSource::new(vec![product(1, dec!(0.0100))], Duration::ZERO);
    let cache = ProductCatalogCache::new(source.clone(), HOUR);

    let a = cache.get().unwrap();
    let b = cache.get().unwrap();

    assert_eq!(source.loads(), 1);
    assert_eq!(a.generation, b.generation);
    assert_eq!(b.products.len(), 1);
}

#[test]
fn expired_snapshot_is_reloaded() {
    let source = CountingSource::new(vec![product(1, dec!(0.0100))], Duration::ZERO);
    let cache = ProductCatalogCache::new(source.clone(), Duration::ZERO);

    let a = cache.get().unwrap();
    source.products.lock().unwrap().push(product(2, dec!(0.0090)));
    let b = cache.get().unwrap();

    assert_eq!(source.loads(), 2);
    assert_eq!(b.generation, a.generation + 1);
    assert_eq!(b.products.len(), 2);
}

#[test]
fn invalidate_forces_one_reload() {
    let source = CountingSource::new(vec![product(1, dec!(0.0100))], Duration::ZERO);
    let cache = ProductCatalogCache::new(source.clone(), HOUR);

    cache.get().unwrap();
    cache.invalidate();
    cache.get().unwrap();
    cache.get().unwrap();

    assert_eq!(source.loads(), 2);
}

#[test]
fn concurrent_first_load_runs_once() {
    let source = CountingSource::new(vec![product(1, dec!(0.0100))], Duration::from_millis(150));
    let cache = Arc::new(ProductCatalogCache::new(source.clone(), HOUR));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get().map(|s| s.products.len())
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), 1);
    }
    assert_eq!(source.loads(), 1, "first load must be coalesced");
}

#[test]
fn concurrent_refresh_is_coalesced_and_readers_see_stale_value() {
    let source = CountingSource::new(
        vec![product(1, dec!(0.0100)), product(2, dec!(0.0080))],
        Duration::from_millis(200),
    );
    let cache = Arc::new(ProductCatalogCache::new(source.clone(), HOUR));
    cache.get().unwrap();
    cache.invalidate();

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get().map(|s| s.generation)
            })
        })
        .collect();

    let generations: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

    assert_eq!(source.loads(), 2, "one priming load plus exactly one refresh");
    assert!(generations.iter().all(|g| *g == 1 || *g == 2), "got {generations:?}");
    assert!(generations.contains(&1), "racing readers should get the stale snapshot");
    assert_eq!(cache.get().unwrap().generation, 2);
}

#[test]
fn failed_reload_keeps_serving_previous_snapshot() {
    let source = CountingSource::new(vec![product(1, dec!(0.0100))], Duration::ZERO);
    let cache = ProductCatalogCache::new(source.clone(), Duration::ZERO);

    let first = cache.get().unwrap();
    source.failing.store(true, Ordering::SeqCst);
    let second = cache.get().unwrap();

    assert_eq!(second.generation, first.generation);
    assert_eq!(second.products, first.products);
}

#[test]
fn failed_first_load_is_catalog_unavailable() {
    let source = CountingSource::new(Vec::new(), Duration::ZERO);
    source.failing.store(true, Ordering::SeqCst);
    let cache = ProductCatalogCache::new(source, HOUR);

    let err = cache.get().unwrap_err();
    assert!(matches!(err, LoanError::CatalogUnavailable { .. }), "got {err:?}");
}

#[test]
fn invalidate_during_reload_forces_another_reload() {
    let source = CountingSource::new(vec![product(1, dec!(0.0100))], Duration::from_millis(200));
    let cache = Arc::new(ProductCatalogCache::new(source.clone(), HOUR));
    cache.get().unwrap();
    cache.invalidate();

    let reloading = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || cache.get().map(|s| s.generation))
    };
    thread::sleep(Duration::from_millis(50));
    cache.invalidate();
    assert_eq!(reloading.join().unwrap().unwrap(), 2);

    assert_eq!(cache.get().unwrap().generation, 3);
    assert_eq!(source.loads(), 3);
}
