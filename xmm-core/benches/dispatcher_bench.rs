//! Dispatcher Benchmarks
//!
//! Depth update to requote decision, and a simulated quote fill with its
//! hedge, both through the BACKTEST matching simulator.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal_macros::dec;
use xmm_core::testing::{depth, public_trade, test_config};
use xmm_core::{Engine, LegId};

fn quoting_engine() -> Engine {
    let mut engine = Engine::new(test_config()).unwrap();
    engine.start(0);
    engine.process_event(depth(1, LegId::A, dec!(100), dec!(101)));
    engine.process_event(depth(2, LegId::B, dec!(50), dec!(51)));
    engine
}

/// Benchmark: depth update that moves one leg's levels (cancel-all and requote)
fn bench_depth_requote(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth_requote");

    let mut engine = quoting_engine();
    let books = [(dec!(50.5), dec!(51.5)), (dec!(50), dec!(51))];
    let mut time_us = 10;

    group.bench_function("alternating_b_top", |b| {
        b.iter(|| {
            time_us += 1;
            let (bid, ask) = books[(time_us % 2) as usize];
            black_box(engine.process_event(black_box(depth(time_us, LegId::B, bid, ask))));
        });
    });

    group.finish();
}

/// Benchmark: depth update with an unchanged top (no cycle)
fn bench_depth_no_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth_no_change");

    let mut engine = quoting_engine();
    let mut time_us = 10;

    group.bench_function("same_top", |b| {
        b.iter(|| {
            time_us += 1;
            black_box(engine.process_event(black_box(depth(time_us, LegId::A, dec!(100), dec!(101)))));
        });
    });

    group.finish();
}

/// Benchmark: public print fills a resting quote, hedge crosses the other book
fn bench_fill_and_hedge(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_and_hedge");

    group.bench_function("quote_fill_round_trip", |b| {
        b.iter_batched(
            quoting_engine,
            |mut engine| {
                black_box(engine.process_event(public_trade(3, LegId::B, dec!(53), dec!(10))));
                engine
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_depth_requote,
    bench_depth_no_change,
    bench_fill_and_hedge
);
criterion_main!(benches);
