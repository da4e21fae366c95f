//! Tipos de evento y estructura `FlowEvent`.
//!
//! - Cada `FlowEngine::run` emite eventos a un `EventStore` append-only bajo
//!   un `run_id` propio.
//! - `ProcessLaunched` se emite exactamente una vez por proceso lanzado; es
//!   la forma observable de contar ejecuciones reales frente a cache hits.
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::NodeError;
use crate::model::Fingerprint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlowEventKind {
    /// Grafo resuelto: primer evento de la run.
    GraphResolved { root: Fingerprint, node_count: usize },
    NodeReady { fingerprint: Fingerprint, flow: String },
    /// Resultado exitoso ya en cache; no se lanza proceso.
    CacheHit { fingerprint: Fingerprint, flow: String },
    /// Otra run estaba ejecutando el mismo fingerprint; se reutiliza su
    /// resultado, sea cual sea.
    ReservationJoined { fingerprint: Fingerprint, flow: String },
    NodeStarted { fingerprint: Fingerprint, flow: String, run_dir: PathBuf },
    ProcessLaunched { fingerprint: Fingerprint, flow: String, pid: u32 },
    NodeSucceeded { fingerprint: Fingerprint, flow: String },
    NodeFailed { fingerprint: Fingerprint, flow: String, error: Option<NodeError> },
    NodeCancelled { fingerprint: Fingerprint, flow: String },
    RunCompleted { succeeded: usize, failed: usize, cancelled: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    pub seq: u64, // orden append dentro de la run
    pub run_id: Uuid,
    pub kind: FlowEventKind,
    pub ts: DateTime<Utc>,
}
