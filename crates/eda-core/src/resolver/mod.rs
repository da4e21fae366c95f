//! Resolución de un `FlowRequest` a un grafo de nodos.
//!
//! Expansión recursiva en profundidad: cada nodo resuelve sus settings por
//! capas, calcula su fingerprint y expande las dependencias que declara.
//! Fingerprints iguales se colapsan en un único nodo; un fingerprint que
//! reaparece en la propia ruta de expansión es un ciclo.
mod graph;

use std::collections::BTreeMap;
use std::sync::Arc;

use eda_domain::Design;
use indexmap::IndexMap;
use serde_json::{json, Value};

pub use graph::{FlowGraph, FlowNode, NodeSettings};

use crate::constants::{ENGINE_VERSION, MAX_RESOLUTION_DEPTH};
use crate::errors::CoreEngineError;
use crate::flow::FlowRegistry;
use crate::hashing::hash_value;
use crate::injection::{CompositeInjector, ParamInjector};
use crate::model::{Fingerprint, NodeFingerprintInput};
use crate::settings::{resolve_settings, SettingsLayers};

/// Petición de ejecución de un flujo sobre un diseño.
#[derive(Debug, Clone)]
pub struct FlowRequest {
    pub flow: String,
    pub design: Arc<Design>,
    /// Settings de proyecto por flow kind.
    pub project: BTreeMap<String, Value>,
    /// Overrides del flujo pedido (capa más alta del nodo raíz).
    pub overrides: Value,
}

impl FlowRequest {
    pub fn new(flow: impl Into<String>, design: impl Into<Arc<Design>>) -> Self {
        Self { flow: flow.into(),
               design: design.into(),
               project: BTreeMap::new(),
               overrides: Value::Null }
    }

    pub fn with_project_settings(mut self, flow: impl Into<String>, settings: Value) -> Self {
        self.project.insert(flow.into(), settings);
        self
    }

    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = overrides;
        self
    }
}

pub struct DependencyResolver<'r> {
    registry: &'r FlowRegistry,
    injectors: &'r [Box<dyn ParamInjector>],
}

struct Expansion<'a> {
    request: &'a FlowRequest,
    design_value: Value,
    nodes: IndexMap<Fingerprint, FlowNode>,
    path: Vec<(Fingerprint, String)>,
}

impl<'r> DependencyResolver<'r> {
    pub fn new(registry: &'r FlowRegistry, injectors: &'r [Box<dyn ParamInjector>]) -> Self {
        Self { registry, injectors }
    }

    /// Resuelve la petición completa. No lanza ningún proceso.
    pub fn resolve(&self, request: &FlowRequest) -> Result<FlowGraph, CoreEngineError> {
        request.design.validate()?;
        let mut exp = Expansion { request,
                                  design_value: request.design.fingerprint_value()?,
                                  nodes: IndexMap::new(),
                                  path: Vec::new() };
        let root = self.expand(&mut exp, &request.flow, request.overrides.clone())?;
        log::debug!("resolved {} into {} node(s)", request.flow, exp.nodes.len());
        Ok(FlowGraph::new(exp.nodes, root))
    }

    fn expand(&self, exp: &mut Expansion<'_>, flow: &str, overrides: Value) -> Result<Fingerprint, CoreEngineError> {
        if exp.path.len() >= MAX_RESOLUTION_DEPTH {
            return Err(CoreEngineError::ResolutionTooDeep(MAX_RESOLUTION_DEPTH));
        }
        let descriptor = self.registry
                             .get(flow)
                             .ok_or_else(|| CoreEngineError::UnknownFlow(flow.to_string()))?;
        let kind = descriptor.kind().to_string();
        let layers = SettingsLayers { platform: CompositeInjector::apply_injectors(self.injectors, &kind),
                                      project: exp.request.project.get(&kind).cloned().unwrap_or(Value::Null),
                                      overrides };

        let settings = match resolve_settings(&descriptor.schema(), &layers) {
            Ok(s) => Arc::new(s),
            Err(err) => {
                let fp = Fingerprint::from_hex(hash_value(&json!({
                    "engine_version": ENGINE_VERSION,
                    "flow": kind,
                    "design": exp.design_value,
                    "invalid_layers": layers.raw(),
                })));
                log::warn!("{err}");
                let design = exp.request.design.clone();
                exp.nodes.entry(fp.clone()).or_insert_with(|| FlowNode { fingerprint: fp.clone(),
                                                                          flow: kind,
                                                                          descriptor,
                                                                          design,
                                                                          settings: NodeSettings::Invalid(err),
                                                                          tool: None,
                                                                          dependencies: Vec::new() });
                return Ok(fp);
            }
        };

        let tool = descriptor.tool(&settings);
        let normalized = settings.normalized();
        let fp = NodeFingerprintInput { engine_version: ENGINE_VERSION,
                                        flow_kind: &kind,
                                        design: &exp.design_value,
                                        settings: &normalized,
                                        tool: Some(&tool) }.fingerprint();

        if let Some(pos) = exp.path.iter().position(|(p, _)| *p == fp) {
            let mut cycle: Vec<String> = exp.path[pos..].iter().map(|(_, k)| k.clone()).collect();
            cycle.push(kind);
            return Err(CoreEngineError::DependencyCycle { cycle });
        }
        if exp.nodes.contains_key(&fp) {
            return Ok(fp);
        }

        exp.path.push((fp.clone(), kind.clone()));
        let mut dependencies = Vec::new();
        for spec in descriptor.dependencies(&settings) {
            let dep = self.expand(exp, &spec.flow, spec.overrides)?;
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }
        exp.path.pop();

        exp.nodes.insert(fp.clone(),
                         FlowNode { fingerprint: fp.clone(),
                                    flow: kind,
                                    descriptor,
                                    design: exp.request.design.clone(),
                                    settings: NodeSettings::Valid(settings),
                                    tool: Some(tool),
                                    dependencies });
        Ok(fp)
    }
}
