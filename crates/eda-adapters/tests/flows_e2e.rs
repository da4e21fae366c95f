#![cfg(unix)]
mod common;

use common::{design, engine_builder, launches_of};
use eda_core::model::keys;
use eda_core::{ArtifactKind, FlowRequest, NodeError, NodeStatus};
use serde_json::json;

#[test]
fn sim_without_dependencies_produces_a_log() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine_builder(tmp.path(), &tmp.path().join("run"), 150.0).build();
    let request = FlowRequest::new("sim", design(tmp.path())).with_overrides(json!({"clock_period": 5.0}));
    let report = engine.run(&request).unwrap();

    let root = report.root_result().unwrap();
    assert_eq!(root.status, NodeStatus::Succeeded, "{:?}", root.error);
    let log = root.artifact(ArtifactKind::Log).expect("log artifact");
    assert!(log.exists());
    assert!(log.is_under(root.run_dir.as_ref().unwrap()));
    let text = std::fs::read_to_string(&log.path).unwrap();
    assert!(text.contains("simulation done"));
    assert_eq!(root.metric_f64(keys::ERRORS), Some(0.0));
    assert!(root.run_dir.as_ref().unwrap().join("sim.sh").is_file());
    assert_eq!(launches_of(&engine, &report, "sim"), 1);
}

#[test]
fn impl_twice_runs_synth_once() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine_builder(tmp.path(), &tmp.path().join("run"), 150.0).build();
    let request = FlowRequest::new("impl", design(tmp.path())).with_overrides(json!({
        "fpga_part": "LFE5U-85F-8BG756C",
        "clock_period": 10,
    }));

    let first = engine.run(&request).unwrap();
    assert!(first.is_success(), "{}", first.to_json());
    assert_eq!(first.nodes.len(), 2);
    assert_eq!(launches_of(&engine, &first, "synth"), 1);
    assert_eq!(launches_of(&engine, &first, "impl"), 1);

    let synth = first.result_for("synth").unwrap();
    assert!(synth.artifact(ArtifactKind::Netlist).is_some());
    assert_eq!(synth.metric_f64(keys::LUT), Some(2.0));
    assert_eq!(synth.metric_f64(keys::WARNINGS), Some(1.0));

    let imp = first.result_for("impl").unwrap();
    assert_eq!(imp.metric_f64(keys::LUT), Some(10.0));
    assert!((imp.metric_f64(keys::FMAX_MHZ).unwrap() - 150.0).abs() < 1e-6);
    assert!(imp.metric_f64(keys::WNS).unwrap() > 0.0);
    assert!(imp.artifact(ArtifactKind::Bitstream).is_some());

    let second = engine.run(&request).unwrap();
    assert!(second.is_success());
    assert_eq!(launches_of(&engine, &second, "synth"), 0);
    assert_eq!(launches_of(&engine, &second, "impl"), 0);
}

#[test]
fn synth_request_matching_the_dependency_is_a_cache_hit() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine_builder(tmp.path(), &tmp.path().join("run"), 150.0).build();
    let d = design(tmp.path());
    let imp = engine.run(&FlowRequest::new("impl", d.clone()).with_overrides(json!({"fpga_part": "LFE5U-85F-8BG756C"})))
                    .unwrap();
    assert!(imp.is_success());

    // mismos settings que `impl` mapea a su dependencia
    let synth = engine.run(&FlowRequest::new("synth", d).with_overrides(json!({"fpga_part": "LFE5U-85F-8BG756C"})))
                      .unwrap();
    assert!(synth.is_success());
    assert_eq!(launches_of(&engine, &synth, "synth"), 0);
    assert!(synth.nodes.values().all(|n| n.reused));
}

#[test]
fn unsupported_part_fails_impl_during_setup() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine_builder(tmp.path(), &tmp.path().join("run"), 150.0).build();
    let request = FlowRequest::new("impl", design(tmp.path())).with_overrides(json!({"fpga_part": "xc7a35ticsg324-1L"}));
    let report = engine.run(&request).unwrap();
    assert_eq!(report.result_for("synth").unwrap().status, NodeStatus::Succeeded);
    let imp = report.result_for("impl").unwrap();
    assert_eq!(imp.status, NodeStatus::Failed);
    assert!(matches!(imp.error, Some(NodeError::Setup { .. })));
    assert_eq!(launches_of(&engine, &report, "impl"), 0);
}

#[test]
fn invalid_settings_are_reported_together() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine_builder(tmp.path(), &tmp.path().join("run"), 150.0).build();
    let request = FlowRequest::new("impl", design(tmp.path())).with_overrides(json!({"board": "mystery", "seed": "x"}));
    let report = engine.run(&request).unwrap();
    let root = report.root_result().unwrap();
    assert_eq!(root.status, NodeStatus::Failed);
    match &root.error {
        Some(NodeError::SettingsInvalid(err)) => {
            assert!(err.has_field("board"));
            assert!(err.has_field("seed"));
            assert!(err.has_field("fpga_part"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(report.nodes.len(), 1);
}
