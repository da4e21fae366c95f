//! Builder para `FlowEngine`.
//!
//! Sólo el registro de flujos es obligatorio; el resto tiene defaults:
//! cache en memoria, `InMemoryEventStore`, `StandardPolicy` y
//! `EngineConfig::default()`.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::core::{EngineConfig, FlowEngine};
use crate::cache::ResultCache;
use crate::event::{EventStore, InMemoryEventStore};
use crate::flow::FlowRegistry;
use crate::injection::ParamInjector;
use crate::policy::{OutcomePolicy, StandardPolicy};
use crate::supervisor::{ProcessSupervisor, SupervisorConfig};

pub struct EngineBuilder {
    registry: FlowRegistry,
    cache: Option<Arc<ResultCache>>,
    events: Option<Arc<dyn EventStore>>,
    policy: Option<Arc<dyn OutcomePolicy>>,
    injectors: Vec<Box<dyn ParamInjector>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub(super) fn new(registry: FlowRegistry) -> Self {
        Self { registry,
               cache: None,
               events: None,
               policy: None,
               injectors: Vec::new(),
               config: EngineConfig::default() }
    }

    /// Cache compartida (p.ej. entre varios engines o con backend FS).
    pub fn cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn event_store(mut self, store: Arc<dyn EventStore>) -> Self {
        self.events = Some(store);
        self
    }

    pub fn policy<P: OutcomePolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn injector(mut self, injector: Box<dyn ParamInjector>) -> Self {
        self.injectors.push(injector);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = jobs.max(1);
        self
    }

    pub fn run_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.run_root = root.into();
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = Some(timeout);
        self
    }

    pub fn supervisor(mut self, config: SupervisorConfig) -> Self {
        self.config.supervisor = config;
        self
    }

    pub fn build(self) -> FlowEngine {
        FlowEngine { registry: Arc::new(self.registry),
                     cache: self.cache.unwrap_or_default(),
                     events: self.events.unwrap_or_else(|| Arc::new(InMemoryEventStore::default())),
                     policy: self.policy.unwrap_or_else(|| Arc::new(StandardPolicy)),
                     injectors: self.injectors,
                     supervisor: ProcessSupervisor::new(self.config.supervisor.clone()),
                     config: self.config }
    }
}
