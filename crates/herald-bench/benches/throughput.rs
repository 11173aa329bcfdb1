//! Throughput benchmarks for Herald.
//!
//! Run with: cargo bench --package herald-bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use herald_bench::{deep_channel, fanout, hierarchy, noop};
use herald_core::{Dispatcher, PublishMode, Selector, SubscribeOptions};
use serde_json::{json, Value};

/// Benchmark dispatcher operations.
fn bench_dispatcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher");

    group.bench_function("subscribe", |b| {
        let dispatcher: Dispatcher = Dispatcher::new();
        let mut i = 0u64;
        b.iter(|| {
            let channel = format!("channel.{}", i);
            i += 1;
            dispatcher
                .subscribe(&channel, noop(), SubscribeOptions::new())
                .unwrap();
        });
    });

    group.bench_function("subscribe_unsubscribe_token", |b| {
        let dispatcher: Dispatcher = Dispatcher::new();
        b.iter(|| {
            let token = dispatcher
                .subscribe("churn", noop(), SubscribeOptions::new())
                .unwrap();
            dispatcher.unsubscribe(Selector::ByToken(black_box(token)))
        });
    });

    group.bench_function("publish_1_sub", |b| {
        let dispatcher = fanout("test", 1);
        b.iter(|| dispatcher.publish_counted("test", black_box(json!(1)), PublishMode::Broadcast));
    });

    group.bench_function("publish_100_sub", |b| {
        let dispatcher = fanout("test", 100);
        b.iter(|| dispatcher.publish_counted("test", black_box(json!(1)), PublishMode::Broadcast));
    });

    group.bench_function("publish_no_sub", |b| {
        let dispatcher: Dispatcher = Dispatcher::new();
        b.iter(|| dispatcher.publish_counted("nobody.home", Value::Null, PublishMode::Broadcast));
    });

    group.finish();
}

/// Benchmark fan-out scenarios.
fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout");

    for size in [10, 100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let dispatcher = fanout("broadcast", size);
            b.iter(|| {
                dispatcher.publish_counted("broadcast", black_box(Value::Null), PublishMode::Broadcast)
            });
        });
    }

    group.finish();
}

/// Benchmark the prefix walk for deep channel names.
fn bench_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy");

    for depth in [1, 4, 16, 64].iter() {
        group.bench_with_input(BenchmarkId::new("broadcast", depth), depth, |b, &depth| {
            let (dispatcher, channel) = hierarchy(depth);
            b.iter(|| dispatcher.publish_counted(&channel, Value::Null, PublishMode::Broadcast));
        });

        group.bench_with_input(BenchmarkId::new("rootless", depth), depth, |b, &depth| {
            let (dispatcher, channel) = hierarchy(depth);
            b.iter(|| dispatcher.publish_counted(&channel, Value::Null, PublishMode::Rootless));
        });

        group.bench_with_input(BenchmarkId::new("unsubscribed", depth), depth, |b, &depth| {
            let dispatcher: Dispatcher = Dispatcher::new();
            let channel = deep_channel(depth);
            b.iter(|| dispatcher.publish_counted(&channel, Value::Null, PublishMode::Broadcast));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatcher, bench_fanout, bench_hierarchy);
criterion_main!(benches);
