//! End-to-end update scenarios.
//!
//! These drive JSON payloads through the handle the way an administrative
//! endpoint would: parse the body, resolve against the stored value, publish.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use coordinator_dynamic_config::{
    baseline_from, ConfigLoader, CoordinatorDynamicConfig, DynamicConfigHandle,
    DynamicConfigUpdate, CONFIG_KEY,
};
use serde_json::json;

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn parse(body: serde_json::Value) -> DynamicConfigUpdate {
    serde_json::from_value(body).unwrap()
}

#[test]
fn update_overrides_named_fields_only() {
    let baseline = CoordinatorDynamicConfig::builder()
        .with_replication_throttle_limit(10)
        .build()
        .unwrap();
    let handle = DynamicConfigHandle::with_config(baseline.clone());

    let outcome = handle
        .apply_update(&parse(json!({
            "replicationThrottleLimit": 20,
            "killDataSourceWhitelist": "ds1,ds2"
        })))
        .unwrap();

    let next = handle.effective();
    assert_eq!(next.replication_throttle_limit(), 20);
    assert_eq!(next.kill_data_source_whitelist(), &names(&["ds1", "ds2"]));
    assert_eq!(
        next.to_builder()
            .with_replication_throttle_limit(10)
            .with_kill_data_source_whitelist(Vec::<String>::new())
            .build()
            .unwrap(),
        baseline
    );

    let fields: Vec<&str> = outcome.changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, ["killDataSourceWhitelist", "replicationThrottleLimit"]);
}

#[test]
fn conflicting_update_leaves_baseline_active() {
    let handle = DynamicConfigHandle::new();
    handle
        .apply_update(&parse(json!({"killDataSourceWhitelist": ["ds1"]})))
        .unwrap();
    let before = handle.effective();

    let err = handle
        .apply_update(&parse(json!({"killAllDataSources": true})))
        .unwrap_err();

    assert!(err.is_invariant_violation());
    assert!(err.to_string().contains("killAllDataSources"));
    assert_eq!(handle.effective(), before);
    assert!(!handle.effective().kill_all_data_sources());
}

#[test]
fn kill_all_accepted_when_update_clears_whitelist() {
    let handle = DynamicConfigHandle::new();
    handle
        .apply_update(&parse(json!({"killDataSourceWhitelist": "ds1"})))
        .unwrap();

    handle
        .apply_update(&parse(json!({
            "killAllDataSources": true,
            "killDataSourceWhitelist": ""
        })))
        .unwrap();

    let active = handle.effective();
    assert!(active.kill_all_data_sources());
    assert!(active.kill_data_source_whitelist().is_empty());
}

#[test]
fn empty_store_uses_defaults_as_baseline() {
    let handle = DynamicConfigHandle::new();
    assert_eq!(baseline_from(&handle), CoordinatorDynamicConfig::default());

    handle
        .apply_update(&parse(json!({"maxSegmentsToMove": 25})))
        .unwrap();

    let active = handle.effective();
    assert_eq!(active.max_segments_to_move(), 25);
    assert_eq!(active.replicant_lifetime(), 15);
    assert_eq!(active.merge_bytes_limit(), 524_288_000);
    assert_eq!(active.millis_to_wait_before_deleting(), 900_000);
}

#[test]
fn zero_threads_clamped_through_handle() {
    let handle = DynamicConfigHandle::new();
    handle
        .apply_update(&parse(json!({"balancerComputeThreads": -3})))
        .unwrap();
    assert_eq!(handle.effective().balancer_compute_threads(), 1);
}

#[test]
fn unrecognized_whitelist_shape_clears_whitelist() {
    let handle = DynamicConfigHandle::new();
    handle
        .apply_update(&parse(json!({"killDataSourceWhitelist": ["a", "b"]})))
        .unwrap();

    handle
        .apply_update(&parse(json!({"killDataSourceWhitelist": 7})))
        .unwrap();

    assert!(handle.effective().kill_data_source_whitelist().is_empty());
}

#[test]
fn null_fields_inherit_from_store() {
    let handle = DynamicConfigHandle::new();
    handle
        .apply_update(&parse(json!({"killDataSourceWhitelist": "keep"})))
        .unwrap();

    let outcome = handle
        .apply_update(&parse(json!({"killDataSourceWhitelist": null})))
        .unwrap();

    assert!(outcome.is_noop());
    assert_eq!(
        handle.effective().kill_data_source_whitelist(),
        &names(&["keep"])
    );
}

#[test]
fn malformed_payloads_never_reach_the_store() {
    for body in [
        json!({"maxSegmentsToMove": "five"}),
        json!({"millisToWaitBeforeDeleting": -1}),
        json!({"emitBalancingStats": "yes"}),
    ] {
        let result: Result<DynamicConfigUpdate, _> = serde_json::from_value(body);
        assert!(result.is_err());
    }
}

#[test]
fn payload_with_extra_keys_applies_known_fields() {
    let handle = DynamicConfigHandle::new();
    let outcome = handle
        .apply_update(&parse(json!({
            "maxSegmentsToMove": 7,
            "killPendingSegmentsSkipList": []
        })))
        .unwrap();

    assert_eq!(outcome.changes.len(), 1);
    assert_eq!(handle.effective().max_segments_to_move(), 7);
}

#[test]
fn stored_value_from_newer_version_is_usable_as_baseline() {
    let mut stored = serde_json::to_value(CoordinatorDynamicConfig::default()).unwrap();
    stored["replicationThrottleLimit"] = json!(25);
    stored["newerField"] = json!("from a later release");

    let baseline: CoordinatorDynamicConfig = serde_json::from_value(stored).unwrap();
    let handle = DynamicConfigHandle::with_config(baseline);
    handle
        .apply_update(&parse(json!({"replicantLifetime": 4})))
        .unwrap();

    let active = handle.effective();
    assert_eq!(active.replication_throttle_limit(), 25);
    assert_eq!(active.replicant_lifetime(), 4);
}

#[test]
fn stored_value_serializes_every_field() {
    let handle = DynamicConfigHandle::new();
    handle.apply_update(&DynamicConfigUpdate::new()).unwrap();

    let stored = serde_json::to_value(&*handle.effective()).unwrap();
    assert_eq!(
        stored,
        json!({
            "millisToWaitBeforeDeleting": 900_000,
            "mergeBytesLimit": 524_288_000,
            "mergeSegmentsLimit": 100,
            "maxSegmentsToMove": 5,
            "replicantLifetime": 15,
            "replicationThrottleLimit": 10,
            "balancerComputeThreads": 1,
            "emitBalancingStats": false,
            "killAllDataSources": false,
            "killDataSourceWhitelist": [],
            "maxSegmentsInNodeLoadingQueue": 0
        })
    );
}

#[test]
fn loader_seeds_handle_then_updates_layer_on_top() {
    let seeded = ConfigLoader::new()
        .with_string("replicantLifetime = 30\nkillDataSourceWhitelist = [\"a\"]", "toml")
        .unwrap()
        .load()
        .unwrap();

    let handle = DynamicConfigHandle::new();
    handle.replace(seeded);

    let baseline = baseline_from(&handle);
    let next = ConfigLoader::new()
        .with_baseline(baseline)
        .with_string(r#"{"maxSegmentsToMove": 9}"#, "json")
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(next.replicant_lifetime(), 30);
    assert_eq!(next.max_segments_to_move(), 9);
    assert_eq!(next.kill_data_source_whitelist(), &names(&["a"]));
}

#[test]
fn handle_answers_only_its_key() {
    use coordinator_dynamic_config::ConfigStore;

    let handle = DynamicConfigHandle::with_config(CoordinatorDynamicConfig::default());
    assert!(handle.current_config(CONFIG_KEY).is_some());
    assert!(handle.current_config("coordinator.compaction").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_updates_are_serialized() {
    let handle = DynamicConfigHandle::new();

    let tasks: Vec<_> = (1..=8)
        .map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move {
                handle
                    .apply_update(&DynamicConfigUpdate {
                        replication_throttle_limit: Some(i),
                        ..Default::default()
                    })
                    .unwrap();
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let limit = handle.effective().replication_throttle_limit();
    assert!((1..=8).contains(&limit));
}

#[tokio::test]
async fn balancer_sees_changes_through_subscription() {
    let handle = DynamicConfigHandle::new();
    let mut receiver = handle.subscribe();

    let balancer = tokio::spawn(async move {
        receiver.changed().await.unwrap();
        let snapshot: Option<Arc<CoordinatorDynamicConfig>> = receiver.borrow_and_update().clone();
        snapshot.map(|config| config.max_segments_to_move())
    });

    handle
        .apply_update(&parse(json!({"maxSegmentsToMove": 40})))
        .unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(5), balancer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen, Some(40));
}

#[tokio::test]
async fn rejected_update_does_not_notify() {
    let handle = DynamicConfigHandle::with_config(
        CoordinatorDynamicConfig::builder()
            .with_kill_data_source_whitelist(["ds1"])
            .build()
            .unwrap(),
    );
    let receiver = handle.subscribe();

    assert!(handle
        .apply_update(&parse(json!({"killAllDataSources": true})))
        .is_err());
    assert!(!receiver.has_changed().unwrap());
}
