use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::model::{Fingerprint, FlowResult, NodeStatus};

/// Resultado de un nodo dentro de una run.
#[derive(Debug, Clone)]
pub struct NodeReport {
    pub flow: String,
    pub dependencies: Vec<Fingerprint>,
    pub result: Arc<FlowResult>,
    /// El resultado vino del cache (o de otra ejecución en vuelo).
    pub reused: bool,
}

/// Resultados de todos los nodos de una run, en orden topológico.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub root: Fingerprint,
    pub nodes: IndexMap<Fingerprint, NodeReport>,
}

impl RunReport {
    pub fn root_result(&self) -> Option<&FlowResult> {
        self.nodes.get(&self.root).map(|n| n.result.as_ref())
    }

    pub fn status(&self) -> NodeStatus {
        self.root_result().map(|r| r.status).unwrap_or(NodeStatus::Pending)
    }

    pub fn is_success(&self) -> bool {
        self.status() == NodeStatus::Succeeded
    }

    /// Primer nodo del flujo `flow`.
    pub fn result_for(&self, flow: &str) -> Option<&FlowResult> {
        self.nodes.values().find(|n| n.flow == flow).map(|n| n.result.as_ref())
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.nodes.values().filter(|n| n.result.status == status).count()
    }

    pub fn to_json(&self) -> Value {
        let nodes: Vec<Value> = self.nodes
                                    .values()
                                    .map(|n| {
                                        json!({
                                            "flow": n.flow,
                                            "dependencies": n.dependencies,
                                            "reused": n.reused,
                                            "result": n.result.as_ref(),
                                        })
                                    })
                                    .collect();
        json!({ "run_id": self.run_id, "root": self.root, "status": self.status(), "nodes": nodes })
    }
}
