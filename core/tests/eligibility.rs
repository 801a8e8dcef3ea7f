mod common;

use common::product;
use loansim_core::{
    config::LoanConfig,
    eligibility::{filter_eligible, resolve_for_simulation, select_best},
    Product,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn bounded(code: i64, rate: Decimal, amount: (Decimal, Decimal), term: (u32, u32)) -> Product {
    Product {
        min_amount: Some(amount.0),
        max_amount: Some(amount.1),
        min_term: Some(term.0),
        max_term: Some(term.1),
        ..product(code, rate)
    }
}

#[test]
fn amount_bounds_are_inclusive() {
    let p = bounded(1, dec!(0.0179), (dec!(200.00), dec!(10000.00)), (0, 24));

    assert!(p.is_eligible(dec!(200.00), 12), "min amount is eligible");
    assert!(p.is_eligible(dec!(10000.00), 12), "max amount is eligible");
    assert!(!p.is_eligible(dec!(10000.01), 12), "one cent over max is not");
    assert!(!p.is_eligible(dec!(199.99), 12), "one cent under min is not");
}

#[test]
fn term_bounds_are_inclusive() {
    let p = bounded(1, dec!(0.0179), (dec!(200.00), dec!(10000.00)), (6, 24));

    assert!(p.is_eligible(dec!(1000), 6));
    assert!(p.is_eligible(dec!(1000), 24));
    assert!(!p.is_eligible(dec!(1000), 5));
    assert!(!p.is_eligible(dec!(1000), 25));
}

#[test]
fn absent_bounds_are_unbounded() {
    let open = product(9, dec!(0.0300));
    assert!(open.is_eligible(dec!(0.01), 1));
    assert!(open.is_eligible(dec!(999999999.99), 600));

    let floor_only = Product { min_amount: Some(dec!(1000000.01)), min_term: Some(96), ..product(4, dec!(0.0151)) };
    assert!(floor_only.is_eligible(dec!(5000000), 360));
    assert!(!floor_only.is_eligible(dec!(1000000.00), 360));
}

#[test]
fn filter_keeps_catalog_order() {
    let catalog = vec![
        product(3, dec!(0.0300)),
        bounded(1, dec!(0.0100), (dec!(0), dec!(100)), (1, 12)),
        product(2, dec!(0.0200)),
    ];
    let codes: Vec<i64> = filter_eligible(&catalog, dec!(500), 12).iter().map(|p| p.code).collect();
    assert_eq!(codes, vec![3, 2]);
}

#[test]
fn lowest_rate_wins() {
    let catalog = vec![product(1, dec!(0.0179)), product(2, dec!(0.0151)), product(3, dec!(0.0182))];
    assert_eq!(select_best(&catalog, dec!(5000), 12).map(|p| p.code), Some(2));
}

#[test]
fn default_catalog_routes_by_band() {
    let catalog = LoanConfig::default_test().products;

    let cases = [
        (dec!(900.00), 5, Some(1)),
        (dec!(10000.00), 24, Some(1)),
        (dec!(10000.01), 25, Some(2)),
        (dec!(250000.00), 60, Some(3)),
        (dec!(2000000.00), 120, Some(4)),
        (dec!(10000.01), 12, None),
        (dec!(100.00), 12, None),
    ];
    for (amount, term, expected) in cases {
        let got = select_best(&catalog, amount, term).map(|p| p.code);
        assert_eq!(got, expected, "amount={amount} term={term}");
    }
}

#[test]
fn reverse_lookup_follows_the_current_catalog() {
    let before = vec![product(1, dec!(0.0200)), product(2, dec!(0.0150))];
    assert_eq!(resolve_for_simulation(&before, dec!(1000), 12).map(|p| p.code), Some(2));

    // Catalog changed after the simulation was created: the answer moves.
    let after = vec![product(1, dec!(0.0100)), product(2, dec!(0.0150))];
    assert_eq!(resolve_for_simulation(&after, dec!(1000), 12).map(|p| p.code), Some(1));

    assert!(resolve_for_simulation(&[], dec!(1000), 12).is_none());
}

// ── Properties ──────────────────────────────────────────────────────────────

fn arb_product(code: i64) -> impl Strategy<Value = Product> {
    (
        0i64..=300,
        proptest::option::of(0i64..=500_000),
        proptest::option::of(0i64..=500_000),
        proptest::option::of(1u32..=60),
        proptest::option::of(1u32..=60),
    )
        .prop_map(move |(bp, a, b, t1, t2)| {
            let (min_amount, max_amount) = match (a, b) {
                (Some(x), Some(y)) => (Some(x.min(y)), Some(x.max(y))),
                other => other,
            };
            let (min_term, max_term) = match (t1, t2) {
                (Some(x), Some(y)) => (Some(x.min(y)), Some(x.max(y))),
                other => other,
            };
            Product {
                code,
                name: format!("P{code}"),
                monthly_rate: Decimal::new(bp, 4),
                min_amount: min_amount.map(|c| Decimal::new(c, 2)),
                max_amount: max_amount.map(|c| Decimal::new(c, 2)),
                min_term,
                max_term,
            }
        })
}

fn arb_catalog() -> impl Strategy<Value = Vec<Product>> {
    (0usize..8).prop_flat_map(|len| {
        (0..len as i64).map(arb_product).collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn select_best_is_deterministic_and_minimal(
        catalog in arb_catalog(),
        cents in 0i64..=500_000,
        term in 1u32..=60,
    ) {
        let amount = Decimal::new(cents, 2);
        let first = select_best(&catalog, amount, term).map(|p| p.code);
        let second = select_best(&catalog, amount, term).map(|p| p.code);
        prop_assert_eq!(first, second);

        let eligible = filter_eligible(&catalog, amount, term);
        match first {
            None => prop_assert!(eligible.is_empty()),
            Some(code) => {
                let min_rate = eligible.iter().map(|p| p.monthly_rate).min().unwrap();
                let expected = eligible.iter().find(|p| p.monthly_rate == min_rate).unwrap().code;
                prop_assert_eq!(code, expected);
            }
        }
    }
}
