#![cfg(unix)]
mod support;

use eda_core::model::keys;
use eda_core::{NodeError, NodeStatus, PolicyReason};
use edaflow_rust::{engine_from_config, Project};
use serde_json::json;

#[test]
fn negative_slack_is_recorded_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let (path, cfg) = support::setup(dir.path(), 80.0);
    let engine = engine_from_config(&cfg).unwrap();
    let report = engine.run(&Project::load(&path).unwrap().request("impl", json!({}))).unwrap();

    assert!(report.is_success(), "{}", report.to_json());
    let imp = report.result_for("impl").unwrap();
    assert!((imp.metric_f64(keys::WNS).unwrap() + 2.5).abs() < 1e-9);
    assert_eq!(imp.metric_f64(keys::FMAX_MHZ), Some(80.0));
}

#[test]
fn negative_slack_fails_with_fail_on_timing() {
    let dir = tempfile::tempdir().unwrap();
    let (path, cfg) = support::setup(dir.path(), 80.0);
    let engine = engine_from_config(&cfg).unwrap();
    let report = engine.run(&Project::load(&path).unwrap().request("impl", json!({"fail_on_timing": true})))
                       .unwrap();

    assert_eq!(report.status(), NodeStatus::Failed);
    assert_eq!(report.result_for("synth").unwrap().status, NodeStatus::Succeeded);
    match &report.result_for("impl").unwrap().error {
        Some(NodeError::PolicyViolation { reasons }) => {
            assert!(matches!(reasons.as_slice(), [PolicyReason::TimingNotMet { wns }] if *wns < 0.0));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn met_timing_passes_with_fail_on_timing() {
    let dir = tempfile::tempdir().unwrap();
    let (path, cfg) = support::setup(dir.path(), 120.0);
    let engine = engine_from_config(&cfg).unwrap();
    let report = engine.run(&Project::load(&path).unwrap().request("impl", json!({"fail_on_timing": true})))
                       .unwrap();
    assert!(report.is_success());
}

#[test]
fn persistent_cache_skips_tools_in_a_new_engine() {
    let dir = tempfile::tempdir().unwrap();
    let (path, mut cfg) = support::setup(dir.path(), 120.0);
    cfg.cache_dir = Some(dir.path().join("cache"));
    let request = Project::load(&path).unwrap().request("impl", json!({}));

    let first = engine_from_config(&cfg).unwrap().run(&request).unwrap();
    assert!(first.is_success());
    assert!(first.nodes.values().all(|n| !n.reused));

    let second = engine_from_config(&cfg).unwrap().run(&request).unwrap();
    assert!(second.is_success());
    assert!(second.nodes.values().all(|n| n.reused));
    assert_eq!(second.root_result().unwrap().fingerprint, first.root_result().unwrap().fingerprint);
}
