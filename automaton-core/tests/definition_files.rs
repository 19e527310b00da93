//! Loads definitions from disk and walks them end to end.

use automaton_core::{
    AutomatonEngine, CoreError, EngineConfig, Event, ExecuteOutcome, MachineDefinition,
    MachineRuntime, NodeId, RuntimeError,
};
use std::path::PathBuf;
use std::sync::Arc;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn delivery() -> Arc<MachineDefinition> {
    Arc::new(MachineDefinition::from_file(fixture("classified_delivery.json")).unwrap())
}

fn fire(runtime: &mut MachineRuntime, transition_id: &str, candidate: &NodeId) -> ExecuteOutcome {
    let guard = runtime
        .definition()
        .transition(transition_id)
        .unwrap()
        .guard
        .clone();
    runtime
        .execute_event(&Event::new(transition_id, candidate.clone(), guard))
        .unwrap()
}

#[test]
fn test_json_and_yaml_fixtures_agree() {
    let json = MachineDefinition::from_file(fixture("classified_delivery.json")).unwrap();
    let yaml = MachineDefinition::from_file(fixture("classified_delivery.yaml")).unwrap();

    assert_eq!(json.label(), "ClassifiedDelivery/default");
    assert_eq!(json.nodes().len(), 3);
    assert_eq!(json.transitions().len(), 6);
    assert_eq!(json.checksum, yaml.checksum);

    let reachable = json.reachable_types();
    assert!(reachable.contains("ReturnToWarehouseDelivery"));
}

#[test]
fn test_missing_fixture() {
    let result = MachineDefinition::from_file(fixture("missing.json"));
    assert!(matches!(result, Err(CoreError::Io(_))));
}

#[test]
fn test_failed_pickup_then_delivery() {
    let mut runtime = MachineRuntime::with_config(delivery(), EngineConfig::sequential("d-"));
    let first = runtime.initiate(None).unwrap();

    // A failed pickup mints a fresh Pickup and consumes the old one.
    let ExecuteOutcome::Advanced { current: second, .. } =
        fire(&mut runtime, "pickup-failed", &first)
    else {
        panic!("expected advance");
    };
    assert_ne!(first, second);
    assert_eq!(runtime.candidate(&second).unwrap().node_type, "Pickup");
    assert_eq!(runtime.instance(&first).unwrap().payload["state"], "FAILED");

    let ExecuteOutcome::Advanced { current: delivery, .. } =
        fire(&mut runtime, "pickup-completed", &second)
    else {
        panic!("expected advance");
    };

    // Two in-place retries are allowed, the third is refused.
    assert!(matches!(
        fire(&mut runtime, "delivery-retry", &delivery),
        ExecuteOutcome::Retried { attempt: 1, .. }
    ));
    assert!(matches!(
        fire(&mut runtime, "delivery-retry", &delivery),
        ExecuteOutcome::Retried { attempt: 2, .. }
    ));
    let guard = runtime
        .definition()
        .transition("delivery-retry")
        .unwrap()
        .guard
        .clone();
    assert!(matches!(
        runtime.execute_event(&Event::new("delivery-retry", delivery.clone(), guard)),
        Err(RuntimeError::RetryLimitExceeded { attempts: 3, max_retry: 2, .. })
    ));

    assert!(matches!(
        fire(&mut runtime, "delivery-completed", &delivery),
        ExecuteOutcome::Resolved { .. }
    ));
    assert!(runtime.is_resolved());
    assert_eq!(
        runtime.history().lineage(&delivery),
        vec![first, second, delivery]
    );
}

#[test]
fn test_return_to_warehouse() {
    let engine = AutomatonEngine::with_config(EngineConfig::sequential("d-"));
    engine
        .put_machine(MachineDefinition::from_file(fixture("classified_delivery.yaml")).unwrap())
        .unwrap();

    let seeded = engine
        .create_runtime("parcel-1", "ClassifiedDelivery", "default", None)
        .unwrap();
    let definition = engine.get_machine("ClassifiedDelivery", "default").unwrap();
    let guard = |id: &str| definition.transition(id).unwrap().guard.clone();

    let ExecuteOutcome::Advanced { current: delivery, .. } = engine
        .execute_event(
            "parcel-1",
            &Event::new("pickup-completed", seeded[0].clone(), guard("pickup-completed")),
        )
        .unwrap()
    else {
        panic!("expected advance");
    };

    let ExecuteOutcome::Advanced { current: returning, .. } = engine
        .execute_event(
            "parcel-1",
            &Event::new("delivery-failed", delivery, guard("delivery-failed")),
        )
        .unwrap()
    else {
        panic!("expected advance");
    };

    let events = engine.get_events("parcel-1", &returning).unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_resolve);

    engine
        .execute_event(
            "parcel-1",
            &Event::new("returned", returning, guard("returned")),
        )
        .unwrap();
    assert!(engine.is_resolved("parcel-1").unwrap());
}
