//! Criterion benchmarks for graph construction and minimum-flow solving.
//!
//! Uses synthetic schedules: random legs between a handful of locations
//! spread over a week.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_trailerflow::flow::{FlowModel, FlowSolver, SimplexSolver, SolverConfig};
use u_trailerflow::network::{BuilderConfig, GraphBuilder};
use u_trailerflow::schedule::Leg;
use u_trailerflow::TrailerPlanner;

// ===========================================================================
// Synthetic schedules
// ===========================================================================

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn synthetic_legs(n: usize, locations: usize, seed: u64) -> Vec<Leg> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let origin = rng.random_range(0..locations);
            let destination = rng.random_range(0..locations);
            let ready = base() + TimeDelta::minutes(rng.random_range(0..7 * 24 * 60));
            let release = ready + TimeDelta::minutes(rng.random_range(60..16 * 60));
            Leg::new(
                format!("R{}", i / 4),
                (i % 4) as u32,
                format!("L{origin}"),
                format!("L{destination}"),
                ready,
                release,
            )
        })
        .collect()
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");
    group.sample_size(10);

    for &n in &[100, 500, 2000] {
        let legs = synthetic_legs(n, 20, 42);
        for parallel in [false, true] {
            let builder = GraphBuilder::new(BuilderConfig::default().with_parallel(parallel));
            group.bench_with_input(
                BenchmarkId::new(if parallel { "parallel" } else { "sequential" }, n),
                &legs,
                |b, legs| {
                    b.iter(|| {
                        let graph = builder.build(black_box(legs));
                        black_box(graph)
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_circulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_circulation");
    group.sample_size(10);

    for &n in &[100, 500, 2000] {
        let legs = synthetic_legs(n, 20, 7);
        for bal_pool in [false, true] {
            let planner = TrailerPlanner::default().with_bal_pool(bal_pool);
            group.bench_with_input(
                BenchmarkId::new(if bal_pool { "balanced" } else { "free" }, n),
                &legs,
                |b, legs| {
                    b.iter(|| {
                        let plan = planner.plan(black_box(legs));
                        black_box(plan)
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_simplex(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplex");
    group.sample_size(10);

    for &n in &[20, 50, 100] {
        let legs = synthetic_legs(n, 5, 11);
        let graph = match GraphBuilder::default().build(&legs) {
            Ok(graph) => graph,
            Err(err) => panic!("synthetic schedule rejected: {err}"),
        };
        let config = SolverConfig::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &graph, |b, graph| {
            b.iter(|| {
                let solution = FlowModel::build(graph, false)
                    .and_then(|model| SimplexSolver::new().solve(&model, black_box(&config)));
                black_box(solution)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_circulation, bench_simplex);
criterion_main!(benches);
