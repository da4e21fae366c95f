//! Grafo resuelto de nodos, deduplicado por fingerprint.
use std::collections::HashMap;
use std::sync::Arc;

use eda_domain::Design;
use indexmap::IndexMap;

use crate::errors::SettingsValidationError;
use crate::flow::FlowDescriptor;
use crate::model::{Fingerprint, ToolIdentity};
use crate::settings::Settings;

/// Settings de un nodo: válidos, o el error completo de validación (el nodo
/// existe igual y falla sin lanzar proceso).
#[derive(Debug, Clone)]
pub enum NodeSettings {
    Valid(Arc<Settings>),
    Invalid(SettingsValidationError),
}

impl NodeSettings {
    pub fn valid(&self) -> Option<&Arc<Settings>> {
        match self {
            NodeSettings::Valid(s) => Some(s),
            NodeSettings::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowNode {
    pub fingerprint: Fingerprint,
    pub flow: String,
    pub descriptor: Arc<dyn FlowDescriptor>,
    pub design: Arc<Design>,
    pub settings: NodeSettings,
    pub tool: Option<ToolIdentity>,
    /// Fingerprints de las dependencias directas, en orden de declaración.
    pub dependencies: Vec<Fingerprint>,
}

/// Nodos en orden topológico (dependencias antes que dependientes).
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: IndexMap<Fingerprint, FlowNode>,
    dependents: HashMap<Fingerprint, Vec<Fingerprint>>,
    root: Fingerprint,
}

impl FlowGraph {
    pub(crate) fn new(nodes: IndexMap<Fingerprint, FlowNode>, root: Fingerprint) -> Self {
        let mut dependents: HashMap<Fingerprint, Vec<Fingerprint>> = HashMap::new();
        for (fp, node) in nodes.iter() {
            for dep in &node.dependencies {
                dependents.entry(dep.clone()).or_default().push(fp.clone());
            }
        }
        Self { nodes,
               dependents,
               root }
    }

    pub fn root(&self) -> &Fingerprint {
        &self.root
    }

    pub fn node(&self, fp: &Fingerprint) -> Option<&FlowNode> {
        self.nodes.get(fp)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, fp: &Fingerprint) -> Option<usize> {
        self.nodes.get_index_of(fp)
    }

    /// Dependientes directos en orden topológico.
    pub fn dependents_of(&self, fp: &Fingerprint) -> &[Fingerprint] {
        self.dependents.get(fp).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Todos los dependientes transitivos, en orden topológico.
    pub fn transitive_dependents(&self, fp: &Fingerprint) -> Vec<Fingerprint> {
        let mut seen: Vec<Fingerprint> = Vec::new();
        let mut stack: Vec<&Fingerprint> = self.dependents_of(fp).iter().collect();
        while let Some(next) = stack.pop() {
            if seen.contains(next) {
                continue;
            }
            seen.push(next.clone());
            stack.extend(self.dependents_of(next));
        }
        seen.sort_by_key(|f| self.position(f));
        seen
    }
}
