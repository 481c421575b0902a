// benches/record_throughput.rs
//
// Write-path and read-path costs of windowed histograms, counters and top trackers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use hdrwin::api::{HdrBuilder, TopBuilder, WindowCounter};

fn bench_record_by_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Elements(1));

    let policies = vec![
        ("reset_on_snapshot", HdrBuilder::new()),
        ("reset_periodically", HdrBuilder::new().reset_periodically(Duration::from_secs(60))),
        ("never_reset", HdrBuilder::new().never_reset()),
    ];

    for (name, builder) in policies {
        let histogram = builder.build_histogram().expect("valid histogram settings");
        group.bench_with_input(BenchmarkId::new("histogram", name), &histogram, |b, histogram| {
            let mut value = 0i64;
            b.iter(|| {
                value = (value + 7_919) % 1_000_000;
                histogram.update(black_box(value));
            });
        });
    }

    let counter = WindowCounter::reset_periodically(Duration::from_secs(60)).expect("valid period");
    group.bench_function("window_counter", |b| b.iter(|| counter.add(black_box(1))));

    group.finish();
}

fn bench_top_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("top_update");
    group.throughput(Throughput::Elements(1));

    for size in [1usize, 10, 100] {
        let top = TopBuilder::new().with_size(size).build_concurrent().expect("valid top settings");
        // fill the top so most updates hit the fast-path rejection
        for latency in 1_000_000..1_000_000 + size as i64 {
            top.update(0, latency, || latency.to_string());
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &top, |b, top| {
            let mut latency = 0i64;
            b.iter(|| {
                latency = (latency + 104_729) % 2_000_000;
                top.update(0, black_box(latency), || format!("query {}", latency))
            });
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    let full = HdrBuilder::new().never_reset().without_snapshot_optimization();
    let predefined = HdrBuilder::new().never_reset();
    let cached = HdrBuilder::new().never_reset().with_snapshot_cache_ttl(Duration::from_secs(60));

    for (name, builder) in [("full", full), ("predefined", predefined), ("cached", cached)] {
        let timer = builder.build_timer().expect("valid timer settings");
        for micros in 1..10_000u64 {
            timer.update(Duration::from_micros(micros));
        }
        group.bench_with_input(BenchmarkId::from_parameter(name), &timer, |b, timer| {
            b.iter(|| black_box(timer.snapshot().p99()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_record_by_policy, bench_top_update, bench_snapshot);
criterion_main!(benches);
