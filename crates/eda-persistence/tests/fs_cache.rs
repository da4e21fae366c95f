use std::fs;
use std::sync::Arc;

use eda_core::{Artifact, ArtifactKind, CacheBackend, Fingerprint, FlowResult, NodeError, NodeStatus, ResultCache};
use eda_persistence::{FsCacheBackend, PersistenceError};

fn succeeded(fp: &Fingerprint) -> FlowResult {
    let mut r = FlowResult::new("synth", fp.clone());
    r.metrics.insert("lut".into(), 42.0.into());
    r.artifacts.push(Artifact::new(ArtifactKind::Netlist, "/runs/synth/outputs/netlist.json"));
    r.finish(NodeStatus::Succeeded, None)
}

#[test]
fn stored_results_survive_a_new_backend() {
    let dir = tempfile::tempdir().unwrap();
    let fp = Fingerprint::from_hex("00ff10");
    FsCacheBackend::open(dir.path()).unwrap().store(&fp, &succeeded(&fp));

    let reopened = FsCacheBackend::open(dir.path()).unwrap();
    let loaded = reopened.load(&fp).expect("cached result");
    assert_eq!(loaded.flow, "synth");
    assert_eq!(loaded.metric_f64("lut"), Some(42.0));
    assert!(loaded.artifact(ArtifactKind::Netlist).is_some());
    assert!(reopened.load(&Fingerprint::from_hex("abcd")).is_none());
}

#[test]
fn failures_are_never_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsCacheBackend::open(dir.path()).unwrap();
    let fp = Fingerprint::from_hex("01");
    backend.store(&fp, &FlowResult::failed("synth", fp.clone(), NodeError::ToolExit { code: Some(1) }));
    assert!(backend.load(&fp).is_none());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn second_store_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsCacheBackend::open(dir.path()).unwrap();
    let fp = Fingerprint::from_hex("beef");
    assert!(backend.write(&fp, &succeeded(&fp)).unwrap());
    let mut other = succeeded(&fp);
    other.metrics.insert("lut".into(), 1.0.into());
    assert!(!backend.write(&fp, &other).unwrap());
    assert_eq!(backend.load(&fp).unwrap().metric_f64("lut"), Some(42.0));
}

#[test]
fn corrupt_or_mismatched_entries_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsCacheBackend::open(dir.path()).unwrap();
    let fp = Fingerprint::from_hex("aa");
    fs::write(backend.entry_path(&fp).unwrap(), "{not json").unwrap();
    assert!(matches!(backend.read(&fp), Err(PersistenceError::Corrupt { .. })));
    assert!(backend.load(&fp).is_none());

    let stored_under = Fingerprint::from_hex("bb");
    fs::write(backend.entry_path(&stored_under).unwrap(),
              serde_json::to_vec(&succeeded(&Fingerprint::from_hex("cc"))).unwrap()).unwrap();
    assert!(backend.load(&stored_under).is_none());
}

#[test]
fn rejects_non_hex_fingerprints() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsCacheBackend::open(dir.path()).unwrap();
    let err = backend.entry_path(&Fingerprint::from_hex("../etc/passwd")).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidFingerprint(_)));
}

#[test]
fn result_cache_reads_through_the_backend() {
    let dir = tempfile::tempdir().unwrap();
    let fp = Fingerprint::from_hex("c0ffee");
    FsCacheBackend::open(dir.path()).unwrap().store(&fp, &succeeded(&fp));

    let cache = ResultCache::with_backend(Box::new(FsCacheBackend::open(dir.path()).unwrap()));
    let hit: Arc<FlowResult> = cache.get(&fp).expect("loaded from disk");
    assert_eq!(hit.fingerprint, fp);
}
