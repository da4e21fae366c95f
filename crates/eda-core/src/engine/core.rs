//! Core FlowEngine implementation

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::builder::EngineBuilder;
use super::report::{NodeReport, RunReport};
use super::scheduler;
use crate::cache::ResultCache;
use crate::errors::CoreEngineError;
use crate::event::{EventStore, FlowEventKind};
use crate::flow::FlowRegistry;
use crate::injection::ParamInjector;
use crate::model::NodeStatus;
use crate::policy::OutcomePolicy;
use crate::resolver::{DependencyResolver, FlowGraph, FlowRequest};
use crate::supervisor::{CancellationToken, ProcessSupervisor, SupervisorConfig};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Máximo de nodos ejecutándose a la vez.
    pub jobs: usize,
    /// Raíz de los directorios de ejecución.
    pub run_root: PathBuf,
    /// Timeout para nodos cuyos settings no fijan `timeout_seconds`.
    pub default_timeout: Option<Duration>,
    pub supervisor: SupervisorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { jobs: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
               run_root: PathBuf::from("eda_run"),
               default_timeout: None,
               supervisor: SupervisorConfig::default() }
    }
}

/// Motor de ejecución de flujos EDA.
///
/// Es `Send + Sync`: varias peticiones concurrentes pueden compartir un
/// mismo engine (y por tanto su cache de resultados).
pub struct FlowEngine {
    pub(super) registry: Arc<FlowRegistry>,
    pub(super) cache: Arc<ResultCache>,
    pub(super) events: Arc<dyn EventStore>,
    pub(super) policy: Arc<dyn OutcomePolicy>,
    pub(super) injectors: Vec<Box<dyn ParamInjector>>,
    pub(super) supervisor: ProcessSupervisor,
    pub(super) config: EngineConfig,
}

impl fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowEngine")
         .field("flows", &self.registry.kinds().collect::<Vec<_>>())
         .field("policy", &self.policy)
         .field("injectors", &self.injectors)
         .field("config", &self.config)
         .finish_non_exhaustive()
    }
}

impl FlowEngine {
    /// Crea un builder con el registro de flujos dado.
    #[inline]
    pub fn builder(registry: FlowRegistry) -> EngineBuilder {
        EngineBuilder::new(registry)
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn shared_cache(&self) -> Arc<ResultCache> {
        self.cache.clone()
    }

    pub fn events(&self) -> &dyn EventStore {
        self.events.as_ref()
    }

    pub fn policy(&self) -> &dyn OutcomePolicy {
        self.policy.as_ref()
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resuelve la petición a un grafo sin ejecutar nada.
    pub fn resolve(&self, request: &FlowRequest) -> Result<FlowGraph, CoreEngineError> {
        DependencyResolver::new(&self.registry, &self.injectors).resolve(request)
    }

    /// Resuelve y ejecuta la petición completa.
    pub fn run(&self, request: &FlowRequest) -> Result<RunReport, CoreEngineError> {
        self.run_with_cancel(request, &CancellationToken::new())
    }

    pub fn run_with_cancel(&self, request: &FlowRequest, cancel: &CancellationToken) -> Result<RunReport, CoreEngineError> {
        let graph = self.resolve(request)?;
        self.execute(&graph, cancel)
    }

    /// Ejecuta un grafo ya resuelto bajo un `run_id` nuevo.
    pub fn execute(&self, graph: &FlowGraph, cancel: &CancellationToken) -> Result<RunReport, CoreEngineError> {
        let run_id = Uuid::new_v4();
        self.events.append_kind(run_id,
                                FlowEventKind::GraphResolved { root: graph.root().clone(),
                                                               node_count: graph.len() });
        log::info!("run {run_id}: {} node(s), up to {} job(s)", graph.len(), self.config.jobs.max(1));

        let runs = scheduler::execute(self, run_id, graph, cancel)?;
        let mut nodes = indexmap::IndexMap::new();
        for node in graph.nodes() {
            if let Some(run) = runs.get(&node.fingerprint) {
                nodes.insert(node.fingerprint.clone(),
                             NodeReport { flow: node.flow.clone(),
                                          dependencies: node.dependencies.clone(),
                                          result: run.result.clone(),
                                          reused: run.reused });
            }
        }
        let report = RunReport { run_id,
                                 root: graph.root().clone(),
                                 nodes };
        let (succeeded, failed, cancelled) =
            (report.count(NodeStatus::Succeeded), report.count(NodeStatus::Failed), report.count(NodeStatus::Cancelled));
        self.events.append_kind(run_id, FlowEventKind::RunCompleted { succeeded, failed, cancelled });
        log::info!("run {run_id}: {succeeded} succeeded, {failed} failed, {cancelled} cancelled");
        Ok(report)
    }
}
