#![cfg(unix)]
mod common;

use common::{builder_with, design, engine_builder, fake_tool, fake_tools};
use eda_core::model::keys;
use eda_core::{FlowRequest, NodeError, NodeStatus, PolicyReason};
use serde_json::json;

fn impl_request(tmp: &std::path::Path, fail_on_timing: bool) -> FlowRequest {
    FlowRequest::new("impl", design(tmp)).with_overrides(json!({
        "fpga_part": "LFE5U-85F-8BG756C",
        "clock_period": 10,
        "fail_on_timing": fail_on_timing,
    }))
}

#[test]
fn missed_timing_fails_impl_when_requested() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine_builder(tmp.path(), &tmp.path().join("run"), 80.0).build();
    let report = engine.run(&impl_request(tmp.path(), true)).unwrap();

    let imp = report.result_for("impl").unwrap();
    assert_eq!(imp.status, NodeStatus::Failed);
    match &imp.error {
        Some(NodeError::PolicyViolation { reasons }) => {
            assert!(matches!(reasons.as_slice(), [PolicyReason::TimingNotMet { wns }] if (*wns + 2.5).abs() < 1e-6),
                    "{reasons:?}")
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!((imp.metric_f64(keys::WNS).unwrap() + 2.5).abs() < 1e-6);
    assert_eq!(report.result_for("synth").unwrap().status, NodeStatus::Succeeded);
}

#[test]
fn missed_timing_is_only_recorded_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = engine_builder(tmp.path(), &tmp.path().join("run"), 80.0).build();
    let report = engine.run(&impl_request(tmp.path(), false)).unwrap();
    assert!(report.is_success(), "{}", report.to_json());
    assert!(report.root_result().unwrap().metric_f64(keys::WNS).unwrap() < 0.0);
}

#[test]
fn error_in_simulation_log_fails_despite_exit_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    std::fs::create_dir(&bin).unwrap();
    let vvp = fake_tool(&bin, "vvp", "echo \"ERROR: tb.v:10: check failed\"\nexit 0");
    let tools = fake_tools(tmp.path(), 150.0).with_tool("vvp", vvp.display().to_string());
    let engine = builder_with(tools, &tmp.path().join("run")).build();

    let report = engine.run(&FlowRequest::new("sim", design(tmp.path())).with_overrides(json!({"clock_period": 5.0})))
                       .unwrap();
    let root = report.root_result().unwrap();
    assert_eq!(root.status, NodeStatus::Failed);
    assert_eq!(root.error,
               Some(NodeError::PolicyViolation { reasons: vec![PolicyReason::ToolErrors { count: 1 }] }));
    assert_eq!(root.metric_f64(keys::ERRORS), Some(1.0));
    assert!(engine.cache().is_empty());
}
