//! Modelo de datos del core: fingerprints, artifacts, métricas, estados y
//! resultados de nodos.

pub mod artifact;
pub mod fingerprint;
pub mod metrics;
pub mod result;
pub mod status;
pub mod tool;

pub use artifact::{Artifact, ArtifactKind};
pub use fingerprint::{Fingerprint, NodeFingerprintInput};
pub use metrics::{keys, MetricValue, Metrics, Table};
pub use result::FlowResult;
pub use status::NodeStatus;
pub use tool::ToolIdentity;
