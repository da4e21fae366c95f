//! Ejecución de un nodo: cache, SETUP, EXECUTE, PARSE y política.
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use uuid::Uuid;

use super::core::FlowEngine;
use crate::cache::Reservation;
use crate::constants::ENGINE_VERSION;
use crate::errors::NodeError;
use crate::event::FlowEventKind;
use crate::flow::{DependencyOutput, ParseContext, SetupContext};
use crate::model::{Artifact, ArtifactKind, FlowResult, NodeStatus};
use crate::resolver::{FlowNode, NodeSettings};
use crate::settings::Settings;
use crate::supervisor::{CancellationToken, RunDir};

/// Resultado de un nodo tal como lo ve el scheduler.
#[derive(Debug, Clone)]
pub(crate) struct NodeRun {
    pub(crate) result: Arc<FlowResult>,
    pub(crate) reused: bool,
}

impl NodeRun {
    pub(crate) fn fresh(result: FlowResult) -> Self {
        Self { result: Arc::new(result),
               reused: false }
    }
}

pub(crate) struct NodeRunner<'e> {
    engine: &'e FlowEngine,
    run_id: Uuid,
}

impl<'e> NodeRunner<'e> {
    pub(crate) fn new(engine: &'e FlowEngine, run_id: Uuid) -> Self {
        Self { engine, run_id }
    }

    fn emit(&self, kind: FlowEventKind) {
        self.engine.events().append_kind(self.run_id, kind);
    }

    pub(crate) fn run(&self, node: &FlowNode, deps: &[DependencyOutput], cancel: &CancellationToken) -> NodeRun {
        let settings = match &node.settings {
            NodeSettings::Valid(s) => s.clone(),
            NodeSettings::Invalid(err) => {
                return NodeRun::fresh(FlowResult::failed(node.flow.clone(),
                                                         node.fingerprint.clone(),
                                                         NodeError::SettingsInvalid(err.clone())))
            }
        };
        match self.engine.cache().reserve(&node.fingerprint, &node.flow) {
            Reservation::Hit(result) => {
                self.emit(FlowEventKind::CacheHit { fingerprint: node.fingerprint.clone(),
                                                    flow: node.flow.clone() });
                NodeRun { result, reused: true }
            }
            Reservation::Joined(result) => {
                self.emit(FlowEventKind::ReservationJoined { fingerprint: node.fingerprint.clone(),
                                                             flow: node.flow.clone() });
                NodeRun { result, reused: true }
            }
            Reservation::Acquired(guard) => {
                let result = self.execute(node, &settings, deps, cancel);
                NodeRun { result: guard.complete(result),
                          reused: false }
            }
        }
    }

    fn execute(&self, node: &FlowNode, settings: &Settings, deps: &[DependencyOutput], cancel: &CancellationToken) -> FlowResult {
        let started = Instant::now();
        let run_dir = RunDir::for_node(&self.engine.config().run_root, &node.design.name, &node.flow, &node.fingerprint);
        let mut result = FlowResult::new(node.flow.clone(), node.fingerprint.clone());
        result.run_dir = Some(run_dir.path().to_path_buf());

        if let Err(e) = run_dir.prepare() {
            return self.seal(&run_dir, result, started, Err(NodeError::io(e)));
        }
        if let Err(e) = run_dir.write_settings(&settings_record(node, settings)) {
            return self.seal(&run_dir, result, started, Err(NodeError::io(e)));
        }
        log::info!("{} [{}] running in {}", node.flow, node.fingerprint.short(), run_dir.path().display());
        self.emit(FlowEventKind::NodeStarted { fingerprint: node.fingerprint.clone(),
                                               flow: node.flow.clone(),
                                               run_dir: run_dir.path().to_path_buf() });

        let outcome = self.launch_and_parse(node, settings, deps, &run_dir, cancel, &mut result);
        self.seal(&run_dir, result, started, outcome)
    }

    fn launch_and_parse(&self,
                        node: &FlowNode,
                        settings: &Settings,
                        deps: &[DependencyOutput],
                        run_dir: &RunDir,
                        cancel: &CancellationToken,
                        result: &mut FlowResult)
                        -> Result<(), NodeError> {
        let descriptor = &node.descriptor;
        // SETUP
        let invocation = descriptor.setup(&SetupContext { design: &node.design,
                                                          settings,
                                                          run_dir,
                                                          dependencies: deps })?;
        if let Some(script) = &invocation.script {
            result.artifacts.push(Artifact::new(ArtifactKind::Script, run_dir.path().join(&script.file_name)));
        }

        // EXECUTE
        let timeout = settings.get_u64("timeout_seconds")
                              .map(Duration::from_secs)
                              .or(self.engine.config().default_timeout);
        let outcome = self.engine.supervisor().run(run_dir, &invocation, timeout, cancel, |pid| {
                                                  self.emit(FlowEventKind::ProcessLaunched { fingerprint: node.fingerprint.clone(),
                                                                                             flow: node.flow.clone(),
                                                                                             pid });
                                              });
        result.artifacts.push(Artifact::new(ArtifactKind::Log, run_dir.log_path()));
        let outcome = outcome?;

        // PARSE
        let log_text = fs::read(run_dir.log_path()).map(|b| String::from_utf8_lossy(&b).into_owned())
                                                    .unwrap_or_default();
        let report = descriptor.parse(&ParseContext { design: &node.design,
                                                      settings,
                                                      run_dir,
                                                      log: &log_text,
                                                      exit_code: outcome.exit_code });
        result.metrics = report.metrics.clone();
        result.tables = report.tables.clone();
        result.partial_metrics = report.partial;
        for artifact in &report.artifacts {
            if !result.artifacts.contains(artifact) {
                result.artifacts.push(artifact.clone());
            }
        }
        for note in &report.notes {
            log::warn!("{} [{}]: {note}", node.flow, node.fingerprint.short());
        }

        if !outcome.success() {
            return Err(NodeError::ToolExit { code: outcome.exit_code });
        }
        for expected in descriptor.expected_artifacts(settings) {
            let path = run_dir.resolve(&expected.path);
            if !path.exists() {
                return Err(NodeError::ArtifactMissing { path: path.display().to_string() });
            }
            let artifact = Artifact::new(expected.kind, path);
            if !result.artifacts.contains(&artifact) {
                result.artifacts.push(artifact);
            }
        }
        let reasons = self.engine.policy().evaluate(settings, &report);
        if !reasons.is_empty() {
            return Err(NodeError::PolicyViolation { reasons });
        }
        Ok(())
    }

    /// Fija el estado terminal y escribe el stamp del run dir.
    fn seal(&self, run_dir: &RunDir, mut result: FlowResult, started: Instant, outcome: Result<(), NodeError>) -> FlowResult {
        result.runtime_secs = Some(started.elapsed().as_secs_f64());
        let result = match outcome {
            Ok(()) => result.finish(NodeStatus::Succeeded, None),
            Err(NodeError::Cancelled) => result.finish(NodeStatus::Cancelled, Some(NodeError::Cancelled)),
            Err(e) => result.finish(NodeStatus::Failed, Some(e)),
        };
        if run_dir.path().is_dir() {
            if let Err(e) = run_dir.write_stamp(&result) {
                log::warn!("could not write {}: {e}", run_dir.stamp_path().display());
            }
        }
        result
    }
}

fn settings_record(node: &FlowNode, settings: &Settings) -> Value {
    json!({
        "engine_version": ENGINE_VERSION,
        "flow": node.flow,
        "fingerprint": node.fingerprint,
        "design": {
            "name": node.design.name,
            "top": node.design.top,
            "rtl_hash": node.design.rtl_hash().ok(),
        },
        "tool": node.tool,
        "dependencies": node.dependencies,
        "settings": settings.normalized(),
    })
}
