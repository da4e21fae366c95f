mod common;

use common::{design, registry, ShellFlow};
use eda_core::resolver::DependencyResolver;
use eda_core::{CoreEngineError, FlowRequest, NodeSettings};
use serde_json::json;

#[test]
fn shared_dependency_collapses_into_one_node() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(vec![ShellFlow::new("base", "true"),
                            ShellFlow::new("left", "true").with_dep("base", json!({"payload": 1})),
                            ShellFlow::new("right", "true").with_dep("base", json!({"payload": 1})),
                            ShellFlow::new("top", "true").with_dep("left", json!(null)).with_dep("right", json!(null))]);
    let graph = DependencyResolver::new(&reg, &[]).resolve(&FlowRequest::new("top", design(tmp.path())))
                                                  .unwrap();
    assert_eq!(graph.len(), 4);
    let kinds: Vec<&str> = graph.nodes().map(|n| n.flow.as_str()).collect();
    assert_eq!(kinds, vec!["base", "left", "right", "top"]);
    let base = graph.nodes().next().unwrap().fingerprint.clone();
    assert_eq!(graph.dependents_of(&base).len(), 2);
    assert_eq!(graph.transitive_dependents(&base).len(), 3);
}

#[test]
fn different_overrides_make_distinct_nodes() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(vec![ShellFlow::new("base", "true"),
                            ShellFlow::new("top", "true").with_dep("base", json!({"payload": 1}))
                                                         .with_dep("base", json!({"payload": 2}))]);
    let graph = DependencyResolver::new(&reg, &[]).resolve(&FlowRequest::new("top", design(tmp.path())))
                                                  .unwrap();
    assert_eq!(graph.len(), 3);
}

#[test]
fn resolution_is_deterministic() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(vec![ShellFlow::new("base", "true"), ShellFlow::new("top", "true").with_dep("base", json!(null))]);
    let req = FlowRequest::new("top", design(tmp.path())).with_overrides(json!({"payload": "x"}));
    let r = DependencyResolver::new(&reg, &[]);
    let a: Vec<_> = r.resolve(&req).unwrap().nodes().map(|n| n.fingerprint.clone()).collect();
    let b: Vec<_> = r.resolve(&req).unwrap().nodes().map(|n| n.fingerprint.clone()).collect();
    assert_eq!(a, b);

    let other = FlowRequest::new("top", design(tmp.path())).with_overrides(json!({"payload": "y"}));
    let root_other = r.resolve(&other).unwrap().root().clone();
    assert_ne!(a.last().unwrap(), &root_other);
    // la dependencia no depende de los settings del padre
    assert_eq!(a[0], r.resolve(&other).unwrap().nodes().next().unwrap().fingerprint);
}

#[test]
fn cycle_is_reported_with_its_path() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(vec![ShellFlow::new("a", "true").with_dep("b", json!(null)),
                            ShellFlow::new("b", "true").with_dep("a", json!(null))]);
    let err = DependencyResolver::new(&reg, &[]).resolve(&FlowRequest::new("a", design(tmp.path())))
                                                .unwrap_err();
    assert_eq!(err,
               CoreEngineError::DependencyCycle { cycle: vec!["a".into(), "b".into(), "a".into()] });
}

#[test]
fn unknown_flow_and_bad_design_fail_resolution() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(vec![ShellFlow::new("base", "true").with_dep("ghost", json!(null))]);
    let r = DependencyResolver::new(&reg, &[]);
    assert_eq!(r.resolve(&FlowRequest::new("base", design(tmp.path()))).unwrap_err(),
               CoreEngineError::UnknownFlow("ghost".into()));

    let broken = eda_core::Design::new("demo", "top").with_source(tmp.path().join("missing.v"));
    assert!(matches!(r.resolve(&FlowRequest::new("base", broken)), Err(CoreEngineError::Design(_))));
}

#[test]
fn invalid_settings_still_produce_a_node() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(vec![ShellFlow::new("base", "true"), ShellFlow::new("top", "true").with_dep("base", json!({"nthreads": 0}))]);
    let graph = DependencyResolver::new(&reg, &[]).resolve(&FlowRequest::new("top", design(tmp.path())))
                                                  .unwrap();
    let base = graph.nodes().next().unwrap();
    match &base.settings {
        NodeSettings::Invalid(err) => assert!(err.has_field("nthreads")),
        other => panic!("expected invalid settings, got {other:?}"),
    }
    assert!(base.tool.is_none());
}
