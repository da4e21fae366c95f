use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::NodeError;
use crate::model::{Artifact, ArtifactKind, Fingerprint, Metrics, NodeStatus, Table};

/// Resultado de un nodo. Inmutable una vez que el estado es terminal: el
/// cache y los dependientes lo comparten vía `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    pub flow: String,
    pub fingerprint: Fingerprint,
    pub status: NodeStatus,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<NodeError>,
    /// El parser no encontró todos los reportes esperados.
    #[serde(default)]
    pub partial_metrics: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl FlowResult {
    pub fn new(flow: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self { flow: flow.into(),
               fingerprint,
               status: NodeStatus::Pending,
               metrics: Metrics::new(),
               tables: BTreeMap::new(),
               artifacts: Vec::new(),
               error: None,
               partial_metrics: false,
               run_dir: None,
               runtime_secs: None,
               finished_at: None }
    }

    /// Fija el estado terminal.
    pub fn finish(mut self, status: NodeStatus, error: Option<NodeError>) -> Self {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.error = error;
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn failed(flow: impl Into<String>, fingerprint: Fingerprint, error: NodeError) -> Self {
        Self::new(flow, fingerprint).finish(NodeStatus::Failed, Some(error))
    }

    pub fn cancelled(flow: impl Into<String>, fingerprint: Fingerprint, error: NodeError) -> Self {
        Self::new(flow, fingerprint).finish(NodeStatus::Cancelled, Some(error))
    }

    pub fn is_success(&self) -> bool {
        self.status == NodeStatus::Succeeded
    }

    pub fn metric_f64(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(|m| m.as_f64())
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn artifacts_of(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }
}
