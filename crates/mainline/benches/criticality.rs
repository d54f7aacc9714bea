//! Benchmarks for the analysis hot paths.
//!
//! These benchmarks measure the performance of:
//! - Graph construction (endpoint clustering) on grids of growing size
//! - A single outage impact query
//! - The full criticality batch, sequential and on the rayon pool

// Benchmark code - performance of the benchmark setup is not critical
#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use mainline::config::AnalysisConfig;
use mainline::criticality::CriticalityJob;
use mainline::graph::{GraphBuilder, GraphSnapshot, SnapshotParts};
use mainline::outage::outage_impact;
use mainline::{
    Building, BuildingId, EdgeId, LineString, Pipe, PipeClass, PipeId, Polygon, Service,
    ServiceId,
};

const STEP: f64 = 0.001;

/// Generate an `n` x `n` street grid with one building per pipe.
///
/// ```text
/// +--+--+
/// |  |  |
/// +--+--+
/// ```
fn grid(n: usize) -> (Vec<Pipe>, Vec<Service>, Vec<Building>) {
    let at = |x: usize, y: usize| [x as f64 * STEP, y as f64 * STEP];
    let mut segments = Vec::new();
    for y in 0..n {
        for x in 0..n {
            if x + 1 < n {
                segments.push((at(x, y), at(x + 1, y)));
            }
            if y + 1 < n {
                segments.push((at(x, y), at(x, y + 1)));
            }
        }
    }

    let mut pipes = Vec::with_capacity(segments.len());
    let mut services = Vec::with_capacity(segments.len());
    let mut buildings = Vec::with_capacity(segments.len());
    for (k, (from, to)) in segments.into_iter().enumerate() {
        let id = k as i64 + 1;
        pipes.push(Pipe {
            id: PipeId(id),
            class: if k % 5 == 0 { PipeClass::Main } else { PipeClass::Secondary },
            diameter_mm: 150,
            material: "pvc".into(),
            install_year: 2000,
            length_m: 111.0,
            geometry: LineString::from(vec![from, to]),
        });
        let [x, y] = to;
        buildings.push(Building {
            id: BuildingId(id),
            geometry: Polygon::new(
                LineString::from(vec![[x, y], [x + 0.0001, y], [x, y + 0.0001], [x, y]]),
                Vec::new(),
            ),
        });
        services.push(Service {
            id: ServiceId(id),
            building_id: BuildingId(id),
            pipe_id: PipeId(id),
            length_m: 10.0,
        });
    }
    (pipes, services, buildings)
}

/// Build the graph for a grid and wrap it in a snapshot.
fn grid_snapshot(n: usize) -> GraphSnapshot {
    let (pipes, services, buildings) = grid(n);
    let built = GraphBuilder::new(1.0).expect("builder").build(&pipes);
    GraphSnapshot::new(SnapshotParts {
        nodes: built.nodes,
        edges: built.edges,
        pipes,
        services,
        buildings,
    })
}

/// Benchmark graph construction with varying grid sizes.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for n in &[10, 30, 60] {
        let (pipes, _, _) = grid(*n);
        let builder = GraphBuilder::new(1.0).expect("builder");

        group.throughput(Throughput::Elements(pipes.len() as u64));
        group.bench_with_input(BenchmarkId::new("grid", n), n, |b, _| {
            b.iter(|| black_box(builder.build(&pipes)));
        });
    }

    group.finish();
}

/// Benchmark a single outage query on the corner edge of a grid.
fn bench_outage(c: &mut Criterion) {
    let mut group = c.benchmark_group("outage");
    let config = AnalysisConfig::default();

    for n in &[10, 30, 60] {
        let snapshot = grid_snapshot(*n);
        group.bench_with_input(BenchmarkId::new("grid", n), n, |b, _| {
            b.iter(|| {
                let impact = outage_impact(&snapshot, EdgeId(1), &config).expect("outage failed");
                black_box(impact)
            });
        });
    }

    group.finish();
}

/// Benchmark the criticality batch, sequential against parallel.
fn bench_criticality(c: &mut Criterion) {
    let mut group = c.benchmark_group("criticality");
    group.sample_size(10);
    let config = AnalysisConfig::default();

    for n in &[10, 20] {
        let snapshot = grid_snapshot(*n);
        group.throughput(Throughput::Elements(snapshot.edge_count() as u64));

        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, n), n, |b, _| {
                b.iter(|| {
                    let scores = CriticalityJob::new(&snapshot, &config)
                        .parallel(parallel)
                        .run()
                        .expect("criticality failed");
                    black_box(scores)
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_outage, bench_criticality);

criterion_main!(benches);
