//! Errores del core.
//!
//! - `CoreEngineError`: fallos que abortan una petición completa (flow
//!   desconocido, ciclo, diseño inválido).
//! - `SettingsValidationError`: todas las violaciones de campo juntas.
//! - `NodeError`: causa terminal de un nodo concreto; viaja dentro del
//!   `FlowResult` y por eso es serializable.

use eda_domain::DomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Fingerprint;
use crate::policy::PolicyReason;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreEngineError {
    #[error("unknown flow kind: {0}")] UnknownFlow(String),
    #[error("dependency cycle: {}", .cycle.join(" -> "))] DependencyCycle { cycle: Vec<String> },
    #[error("dependency expansion exceeded depth {0}")] ResolutionTooDeep(usize),
    #[error("invalid design: {0}")] Design(#[from] DomainError),
    #[error("invalid fmax search: {0}")] InvalidSearch(String),
    #[error("internal: {0}")] Internal(String),
}

/// Violación de un campo concreto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(),
               message: message.into() }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}", render_violations(.flow, .violations))]
pub struct SettingsValidationError {
    pub flow: String,
    pub violations: Vec<FieldViolation>,
}

impl SettingsValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn render_violations(flow: &str, violations: &[FieldViolation]) -> String {
    let items: Vec<String> = violations.iter().map(|v| format!("{}: {}", v.field, v.message)).collect();
    format!("{} invalid setting(s) for {flow}: {}", violations.len(), items.join("; "))
}

#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeError {
    #[error("{0}")] SettingsInvalid(SettingsValidationError),
    #[error("setup failed: {message}")] Setup { message: String },
    #[error("could not launch {executable}: {reason}")] Spawn { executable: String, reason: String },
    #[error("tool exited with code {code:?}")] ToolExit { code: Option<i32> },
    #[error("timed out after {seconds}s")] Timeout { seconds: u64 },
    #[error("cancelled")] Cancelled,
    #[error("dependency {flow} ({fingerprint}) did not succeed")] DependencyFailed { flow: String, fingerprint: Fingerprint },
    #[error("outcome rejected: {}", .reasons.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("; "))]
    PolicyViolation { reasons: Vec<PolicyReason> },
    #[error("expected artifact missing: {path}")] ArtifactMissing { path: String },
    #[error("io: {message}")] Io { message: String },
    #[error("internal: {message}")] Internal { message: String },
}

impl NodeError {
    pub fn io(err: impl std::fmt::Display) -> Self {
        NodeError::Io { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_error_lists_every_violation() {
        let e = SettingsValidationError { flow: "synth".into(),
                                          violations: vec![FieldViolation::new("a", "bad"), FieldViolation::new("b", "worse")] };
        let msg = e.to_string();
        assert!(msg.starts_with("2 invalid setting(s) for synth"));
        assert!(msg.contains("a: bad") && msg.contains("b: worse"));
        assert!(e.has_field("b"));
    }

    #[test]
    fn node_error_serializes_with_tag() {
        let v = serde_json::to_value(NodeError::Timeout { seconds: 3 }).unwrap();
        assert_eq!(v["kind"], "timeout");
        let back: NodeError = serde_json::from_value(v).unwrap();
        assert_eq!(back, NodeError::Timeout { seconds: 3 });
    }
}
