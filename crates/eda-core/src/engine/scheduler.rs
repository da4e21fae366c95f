//! Scheduler: despacha nodos listos a un pool de `jobs` workers.
//!
//! - Un nodo pasa a READY sólo cuando todas sus dependencias terminaron
//!   SUCCEEDED.
//! - El fallo (o cancelación) de un nodo cancela a todos sus dependientes
//!   transitivos sin lanzar proceso alguno.
//! - La cola de listos respeta el orden topológico del grafo, así que el
//!   despacho es determinista para un mismo grafo.
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};

use uuid::Uuid;

use super::core::FlowEngine;
use super::runner::{NodeRun, NodeRunner};
use crate::errors::{CoreEngineError, NodeError};
use crate::event::FlowEventKind;
use crate::flow::DependencyOutput;
use crate::model::{Fingerprint, FlowResult, NodeStatus};
use crate::resolver::{FlowGraph, FlowNode, NodeSettings};
use crate::supervisor::CancellationToken;

pub(crate) fn execute(engine: &FlowEngine,
                      run_id: Uuid,
                      graph: &FlowGraph,
                      cancel: &CancellationToken)
                      -> Result<HashMap<Fingerprint, NodeRun>, CoreEngineError> {
    let jobs = engine.config().jobs.max(1);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs)
                                              .thread_name(|i| format!("edaflow-worker-{i}"))
                                              .build()
                                              .map_err(|e| CoreEngineError::Internal(e.to_string()))?;
    let runner = NodeRunner::new(engine, run_id);
    let mut state = SchedState::new(engine, run_id, graph);
    state.seed();

    let (tx, rx) = mpsc::channel::<(Fingerprint, NodeRun)>();
    pool.in_place_scope(|scope| {
        let mut in_flight = 0usize;
        loop {
            while in_flight < jobs {
                let Some(fp) = state.ready.pop_front() else { break };
                if cancel.is_cancelled() {
                    state.cancel(&fp, NodeError::Cancelled);
                    continue;
                }
                let Some(node) = graph.node(&fp) else { continue };
                let deps = state.dependency_outputs(node);
                state.transition(&fp, NodeStatus::Running);
                let tx = tx.clone();
                let runner = &runner;
                in_flight += 1;
                scope.spawn(move |_| {
                    let run = catch_unwind(AssertUnwindSafe(|| runner.run(node, &deps, cancel)))
                        .unwrap_or_else(|_| {
                            let err = NodeError::Internal { message: format!("worker panicked while running {}", node.flow) };
                            NodeRun::fresh(FlowResult::failed(node.flow.clone(), node.fingerprint.clone(), err))
                        });
                    let _ = tx.send((fp, run));
                });
            }
            if in_flight == 0 {
                break;
            }
            match rx.recv() {
                Ok((fp, run)) => {
                    in_flight -= 1;
                    state.finish(&fp, run);
                }
                Err(_) => break,
            }
        }
    });

    state.cancel_remaining();
    Ok(state.runs)
}

struct SchedState<'a> {
    engine: &'a FlowEngine,
    run_id: Uuid,
    graph: &'a FlowGraph,
    status: HashMap<Fingerprint, NodeStatus>,
    waiting_on: HashMap<Fingerprint, usize>,
    runs: HashMap<Fingerprint, NodeRun>,
    ready: VecDeque<Fingerprint>,
}

impl<'a> SchedState<'a> {
    fn new(engine: &'a FlowEngine, run_id: Uuid, graph: &'a FlowGraph) -> Self {
        let status = graph.nodes().map(|n| (n.fingerprint.clone(), NodeStatus::Pending)).collect();
        let waiting_on = graph.nodes().map(|n| (n.fingerprint.clone(), n.dependencies.len())).collect();
        Self { engine,
               run_id,
               graph,
               status,
               waiting_on,
               runs: HashMap::new(),
               ready: VecDeque::new() }
    }

    fn seed(&mut self) {
        let graph = self.graph;
        for node in graph.nodes().filter(|n| n.dependencies.is_empty()) {
            self.promote(&node.fingerprint);
        }
    }

    fn status_of(&self, fp: &Fingerprint) -> NodeStatus {
        self.status.get(fp).copied().unwrap_or(NodeStatus::Pending)
    }

    fn transition(&mut self, fp: &Fingerprint, next: NodeStatus) {
        let current = self.status_of(fp);
        debug_assert!(current.can_transition_to(next), "{fp}: {current} -> {next}");
        self.status.insert(fp.clone(), next);
    }

    fn emit(&self, kind: FlowEventKind) {
        self.engine.events().append_kind(self.run_id, kind);
    }

    /// Todas las dependencias terminaron bien: el nodo pasa a READY, salvo
    /// que sus settings sean inválidos (FAILED sin lanzar nada).
    fn promote(&mut self, fp: &Fingerprint) {
        let graph = self.graph;
        let Some(node) = graph.node(fp) else { return };
        if let NodeSettings::Invalid(err) = &node.settings {
            let result = FlowResult::failed(node.flow.clone(), fp.clone(), NodeError::SettingsInvalid(err.clone()));
            self.finish(fp, NodeRun::fresh(result));
            return;
        }
        self.transition(fp, NodeStatus::Ready);
        self.emit(FlowEventKind::NodeReady { fingerprint: fp.clone(),
                                             flow: node.flow.clone() });
        self.ready.push_back(fp.clone());
    }

    fn cancel(&mut self, fp: &Fingerprint, error: NodeError) {
        let graph = self.graph;
        let Some(node) = graph.node(fp) else { return };
        let result = FlowResult::cancelled(node.flow.clone(), fp.clone(), error);
        self.finish(fp, NodeRun::fresh(result));
    }

    fn finish(&mut self, fp: &Fingerprint, run: NodeRun) {
        let graph = self.graph;
        let status = run.result.status;
        let flow = run.result.flow.clone();
        self.transition(fp, status);
        match status {
            NodeStatus::Succeeded => {
                log::info!("{flow} [{}] succeeded{}", fp.short(), if run.reused { " (cached)" } else { "" });
                self.emit(FlowEventKind::NodeSucceeded { fingerprint: fp.clone(),
                                                         flow: flow.clone() });
            }
            NodeStatus::Cancelled => {
                log::info!("{flow} [{}] cancelled", fp.short());
                self.emit(FlowEventKind::NodeCancelled { fingerprint: fp.clone(),
                                                         flow: flow.clone() });
            }
            _ => {
                let error = run.result.error.clone();
                match &error {
                    Some(e) => log::error!("{flow} [{}] failed: {e}", fp.short()),
                    None => log::error!("{flow} [{}] failed", fp.short()),
                }
                self.emit(FlowEventKind::NodeFailed { fingerprint: fp.clone(),
                                                      flow: flow.clone(),
                                                      error });
            }
        }
        self.runs.insert(fp.clone(), run);

        if status == NodeStatus::Succeeded {
            for dep in graph.dependents_of(fp) {
                let Some(waiting) = self.waiting_on.get_mut(dep) else { continue };
                *waiting = waiting.saturating_sub(1);
                if *waiting == 0 && self.status_of(dep) == NodeStatus::Pending {
                    self.promote(dep);
                }
            }
        } else {
            for dep in graph.transitive_dependents(fp) {
                if !self.status_of(&dep).is_terminal() {
                    self.cancel(&dep, NodeError::DependencyFailed { flow: flow.clone(),
                                                                    fingerprint: fp.clone() });
                }
            }
        }
    }

    fn dependency_outputs(&self, node: &FlowNode) -> Vec<DependencyOutput> {
        node.dependencies
            .iter()
            .filter_map(|d| {
                self.runs.get(d).map(|run| DependencyOutput { flow: run.result.flow.clone(),
                                                              result: Arc::clone(&run.result) })
            })
            .collect()
    }

    /// Tras una cancelación quedan nodos sin despachar; todos terminan
    /// CANCELLED.
    fn cancel_remaining(&mut self) {
        let graph = self.graph;
        for node in graph.nodes() {
            if !self.status_of(&node.fingerprint).is_terminal() {
                self.cancel(&node.fingerprint, NodeError::Cancelled);
            }
        }
    }
}
