//! Runtime and engine benchmarks.

use automaton_core::{
    AutomatonEngine, EngineConfig, Event, MachineDefinition, MachineRuntime, PatchOperation,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Unique runtime ids across all benchmark iterations
static RUNTIME_COUNTER: AtomicU64 = AtomicU64::new(0);

fn chain_definition(len: usize) -> serde_json::Value {
    let mut nodes: Vec<serde_json::Value> = (0..len)
        .map(|i| {
            serde_json::json!({
                "type": format!("step_{}", i),
                "isEntryNode": i == 0,
                "payload": {"state": "NEW"}
            })
        })
        .collect();
    nodes.push(serde_json::json!({"type": "done", "isResolveNode": true}));

    let mut transitions: Vec<serde_json::Value> = (0..len - 1)
        .map(|i| {
            serde_json::json!({
                "id": format!("next_{}", i),
                "from": format!("step_{}", i),
                "to": format!("step_{}", i + 1),
                "matchCondition": {"op": "replace", "path": "/state", "value": "OK"}
            })
        })
        .collect();
    transitions.push(serde_json::json!({
        "id": "finish",
        "from": format!("step_{}", len - 1),
        "isResolveEvent": true,
        "matchCondition": {"op": "replace", "path": "/state", "value": "OK"}
    }));

    serde_json::json!({
        "name": format!("chain_{}", len),
        "nodes": nodes,
        "transitions": transitions
    })
}

fn ok() -> PatchOperation {
    PatchOperation::replace("/state", "OK").unwrap()
}

fn bench_load_definition(c: &mut Criterion) {
    let mut group = c.benchmark_group("definition_load");

    for len in [2usize, 20, 200] {
        let doc = chain_definition(len);
        group.bench_with_input(BenchmarkId::new("chain", len), &doc, |b, doc| {
            b.iter(|| black_box(MachineDefinition::from_json(doc).unwrap()))
        });
    }

    group.finish();
}

fn bench_walk_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("runtime_walk");

    for len in [10usize, 100] {
        let definition = Arc::new(MachineDefinition::from_json(&chain_definition(len)).unwrap());
        let events: Vec<String> = (0..len - 1)
            .map(|i| format!("next_{}", i))
            .chain(std::iter::once("finish".to_string()))
            .collect();

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("sequential_ids", len), &len, |b, _| {
            b.iter(|| {
                let mut runtime =
                    MachineRuntime::with_config(definition.clone(), EngineConfig::sequential("n"));
                let mut current = runtime.initiate(None).unwrap();
                for id in &events {
                    if let automaton_core::ExecuteOutcome::Advanced { current: next, .. } = runtime
                        .execute_event(&Event::new(id.as_str(), current.clone(), ok()))
                        .unwrap()
                    {
                        current = next;
                    }
                }
                black_box(runtime.is_resolved())
            })
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("runtime_snapshot");

    let definition = Arc::new(MachineDefinition::from_json(&chain_definition(100)).unwrap());
    let mut runtime = MachineRuntime::with_config(definition.clone(), EngineConfig::sequential("n"));
    let mut current = runtime.initiate(None).unwrap();
    for i in 0..99 {
        if let automaton_core::ExecuteOutcome::Advanced { current: next, .. } = runtime
            .execute_event(&Event::new(format!("next_{}", i), current.clone(), ok()))
            .unwrap()
        {
            current = next;
        }
    }

    group.bench_function("save", |b| b.iter(|| black_box(runtime.save())));

    let snapshot = runtime.save();
    group.bench_function("restore", |b| {
        b.iter(|| black_box(MachineRuntime::restore(definition.clone(), &snapshot).unwrap()))
    });

    group.bench_function("json", |b| {
        b.iter(|| black_box(snapshot.to_json().unwrap()))
    });

    group.finish();
}

fn bench_engine_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_execute");

    let engine = AutomatonEngine::new();
    engine.put_machine_json(&chain_definition(2)).unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("create_and_advance", |b| {
        b.iter(|| {
            let id = format!("rt-{}", RUNTIME_COUNTER.fetch_add(1, Ordering::Relaxed));
            let seeded = engine
                .create_runtime(&id, "chain_2", "default", None)
                .unwrap();
            black_box(
                engine
                    .execute_event(&id, &Event::new("next_0", seeded[0].clone(), ok()))
                    .unwrap(),
            );
            engine.remove_runtime(&id).unwrap()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_load_definition,
    bench_walk_chain,
    bench_snapshot,
    bench_engine_execute
);
criterion_main!(benches);
