//! Criterion micro-benchmarks for raw-pointer kernels vs checked iteration.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tether_bench::{foreign_signal, native_signal, LARGE, MEDIUM, SMALL};
use tether_bridge::{scale, sum_doubles, with_raw_parts, RawParts};
use tether_core::ExportBuffer;
use tether_foreign::adopt;

/// Benchmark: sum through the bridge kernel, by size.
fn bench_sum_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge_sum_kernel");
    for len in [SMALL, MEDIUM, LARGE] {
        let v = native_signal(len, 42);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &v, |b, v| {
            b.iter(|| black_box(sum_doubles(v).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark: the same sum via per-element checked view reads.
fn bench_sum_checked_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge_sum_checked_view");
    for len in [SMALL, MEDIUM] {
        let a = foreign_signal(len, 42);
        let view = adopt::<f64>(&a.export_buffer().unwrap()).unwrap();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &view, |b, view| {
            b.iter(|| {
                let total: f64 = view.iter().map(|v| v.unwrap()).sum();
                black_box(total)
            });
        });
    }
    group.finish();
}

/// Benchmark: pointer extraction alone (descriptor + freshness check).
fn bench_raw_parts(c: &mut Criterion) {
    let a = foreign_signal(MEDIUM, 42);

    c.bench_function("bridge_raw_parts_from_source", |b| {
        b.iter(|| black_box(RawParts::<f64>::from_source(&a).unwrap().len()));
    });

    c.bench_function("bridge_with_raw_parts_len", |b| {
        b.iter(|| black_box(with_raw_parts::<f64, _, _>(&a, |_, len| len).unwrap()));
    });
}

/// Benchmark: in-place scaling through a writable descriptor.
fn bench_scale(c: &mut Criterion) {
    let mut v = native_signal(MEDIUM, 42);

    let mut group = c.benchmark_group("bridge_scale");
    group.throughput(Throughput::Elements(MEDIUM as u64));
    group.bench_function("100k", |b| {
        // Alternating factors keep values bounded across iterations.
        let mut factor = 2.0;
        b.iter(|| {
            scale(&mut v, factor).unwrap();
            factor = 1.0 / factor;
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_sum_kernel,
    bench_sum_checked_view,
    bench_raw_parts,
    bench_scale
);
criterion_main!(benches);
