//! Criterion benchmarks for unit-hydrograph discretisation.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use freshet_processes::{ResponseFunction, UnitHydrograph};

fn bench_gamma_fixed(c: &mut Criterion) {
    let response = ResponseFunction::Gamma {
        shape: 3.0,
        rate: 0.2,
    };
    c.bench_function("uh_gamma_fixed", |b| {
        b.iter(|| black_box(UnitHydrograph::fixed(black_box(&response), 1.0)));
    });
}

fn bench_gamma_smart(c: &mut Criterion) {
    let response = ResponseFunction::Gamma {
        shape: 3.0,
        rate: 0.2,
    };
    c.bench_function("uh_gamma_smart", |b| {
        b.iter(|| black_box(UnitHydrograph::smart(black_box(&response), 1.0)));
    });
}

fn bench_gr4j_smart_hourly(c: &mut Criterion) {
    let response = ResponseFunction::Gr4j2 { x4: 20.0 };
    c.bench_function("uh_gr4j2_smart_hourly", |b| {
        b.iter(|| black_box(UnitHydrograph::smart(black_box(&response), 1.0 / 24.0)));
    });
}

criterion_group!(
    benches,
    bench_gamma_fixed,
    bench_gamma_smart,
    bench_gr4j_smart_hourly
);
criterion_main!(benches);
