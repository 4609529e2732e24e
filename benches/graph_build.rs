//! Benchmarks for pipeline completion and link building
//!
//! Run with: cargo bench

use camgraph::pipeline::{
    resolve, Coordinator, DeviceRef, NodeId, NodeTable, PipelineConfig, StaticSubdevice,
    Topology,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// `len` passthrough blocks between a sensor and the capture node.
struct Chain {
    topology: Topology,
    config: PipelineConfig,
    devices: Vec<(NodeId, DeviceRef)>,
}

fn chain(len: usize) -> Chain {
    let mut topology = Topology::new();
    let vi = topology.add_node("vi").unwrap();
    let sensor = topology.add_node("sensor").unwrap();
    let mut devices = vec![
        (vi, StaticSubdevice::capture("vi").into_ref()),
        (sensor, StaticSubdevice::sensor("sensor").into_ref()),
    ];

    let mut upstream = (sensor, 0);
    for i in 0..len {
        let name = format!("block{}", i);
        let block = topology.add_node(name.as_str()).unwrap();
        topology.connect(upstream.0, upstream.1, block, 0).unwrap();
        devices.push((block, StaticSubdevice::passthrough(name).into_ref()));
        upstream = (block, 1);
    }
    topology.connect(upstream.0, upstream.1, vi, 0).unwrap();

    Chain {
        topology,
        config: PipelineConfig::new(vi, "vi-output-0"),
        devices,
    }
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let fixture = chain(64);

    group.throughput(Throughput::Elements(fixture.devices.len() as u64));
    group.bench_function("all_nodes", |b| {
        b.iter(|| {
            let total: usize = fixture
                .devices
                .iter()
                .map(|(node, _)| resolve(&fixture.topology, *node).map_or(0, |e| e.count()))
                .sum();
            black_box(total)
        });
    });

    group.finish();
}

fn bench_complete_and_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("complete_and_publish");

    for len in [1usize, 8, 64, 256].iter() {
        let fixture = chain(*len);
        let required: Vec<NodeId> = fixture.devices.iter().map(|(n, _)| *n).collect();

        group.throughput(Throughput::Elements(fixture.devices.len() as u64));
        group.bench_with_input(BenchmarkId::new("chain", len), &fixture, |b, fixture| {
            b.iter(|| {
                let mut coordinator = Coordinator::new(
                    fixture.topology.clone(),
                    NodeTable::new(),
                    fixture.config.clone(),
                    required.iter().copied(),
                )
                .unwrap();
                // Sensor-first, reverse of declaration
                for (node, device) in fixture.devices.iter().rev() {
                    coordinator.register(*node, device.clone()).unwrap();
                }
                black_box(coordinator.pipeline().link_count())
            });
        });
    }

    group.finish();
}

fn bench_reset_cycle(c: &mut Criterion) {
    let fixture = chain(16);
    let required: Vec<NodeId> = fixture.devices.iter().map(|(n, _)| *n).collect();
    let mut coordinator = Coordinator::new(
        fixture.topology.clone(),
        NodeTable::new(),
        fixture.config.clone(),
        required,
    )
    .unwrap();

    c.bench_function("reset_and_rebuild", |b| {
        b.iter(|| {
            for (node, device) in &fixture.devices {
                coordinator.register(*node, device.clone()).unwrap();
            }
            coordinator.reset().unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_complete_and_publish,
    bench_reset_cycle,
);

criterion_main!(benches);
