//! Benchmarks for planning and orchestration.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deployflow::core::{ResourceReference, StageId};
use deployflow::orchestrator::DeploymentRequest;
use deployflow::pipeline::{plan, StageCatalog, StageDefinition};
use deployflow::testing::{standard_catalog, DeployHarness, WEATHER_AGENT_PATH};
use std::collections::BTreeSet;

fn chain_catalog(len: usize) -> StageCatalog {
    let mut builder = StageCatalog::builder();
    for i in 0..len {
        let mut stage = StageDefinition::new(format!("stage-{i:03}"));
        if i > 0 {
            stage = stage.with_dependency(format!("stage-{:03}", i - 1));
        }
        builder = builder.stage(stage).unwrap();
    }
    builder.build().unwrap()
}

fn planning_benchmark(c: &mut Criterion) {
    let catalog = standard_catalog();
    let selection = BTreeSet::from([StageId::from("agents")]);
    c.bench_function("plan_standard", |b| {
        b.iter(|| plan(black_box(&selection), black_box(&catalog)).unwrap());
    });

    let chain = chain_catalog(100);
    let every_other: BTreeSet<StageId> = chain.ids().into_iter().step_by(2).collect();
    c.bench_function("plan_chain_100", |b| {
        b.iter(|| plan(black_box(&every_other), black_box(&chain)).unwrap());
    });

    c.bench_function("build_chain_100", |b| {
        b.iter(|| chain_catalog(black_box(100)));
    });
}

fn orchestrator_benchmark(c: &mut Criterion) {
    let harness = DeployHarness::new();
    harness.inventory.insert(ResourceReference::connection("weathertool"));
    let orchestrator = harness.orchestrator();
    let request = DeploymentRequest::new(["agents"]).with_descriptor("agents", WEATHER_AGENT_PATH);

    c.bench_function("run_agents_only", |b| {
        b.iter(|| tokio_test::block_on(orchestrator.run(black_box(&request))).unwrap());
    });
}

criterion_group!(benches, planning_benchmark, orchestrator_benchmark);
criterion_main!(benches);
