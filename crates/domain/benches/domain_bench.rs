//! Benchmarks for cart validation and total computation.

use std::collections::HashMap;

use common::BookId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Cart, Money};

fn bench_cart_construction(c: &mut Criterion) {
    let ids: Vec<BookId> = (0..100).map(|_| BookId::new()).collect();

    c.bench_function("cart_new_100_lines", |b| {
        b.iter(|| Cart::new(ids.iter().map(|id| (*id, 2))).unwrap())
    });
}

fn bench_total_computation(c: &mut Criterion) {
    let ids: Vec<BookId> = (0..100).map(|_| BookId::new()).collect();
    let cart = Cart::new(ids.iter().map(|id| (*id, 2))).unwrap();
    let prices: HashMap<BookId, Money> = ids
        .iter()
        .map(|id| (*id, Money::from_cents(999)))
        .collect();

    c.bench_function("cart_total_100_lines", |b| {
        b.iter(|| cart.total_with(|id| prices.get(&id).copied()).unwrap())
    });
}

criterion_group!(benches, bench_cart_construction, bench_total_computation);
criterion_main!(benches);
