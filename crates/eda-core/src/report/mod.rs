//! Modelo de reporte parseado y helpers de texto compartidos por los
//! parsers de cada herramienta.

pub mod text;

use std::collections::BTreeMap;

use crate::model::{Artifact, MetricValue, Metrics, Table};

/// Salida de la fase PARSE. Lo que no se pudo leer se marca `partial` con
/// una nota; nunca se inventan valores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReport {
    pub metrics: Metrics,
    pub tables: BTreeMap<String, Table>,
    pub artifacts: Vec<Artifact>,
    pub partial: bool,
    pub notes: Vec<String>,
}

impl ParsedReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_metric(&mut self, key: &str, value: impl Into<MetricValue>) {
        self.metrics.insert(key.to_string(), value.into());
    }

    pub fn metric_f64(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(MetricValue::as_f64)
    }

    pub fn add_table(&mut self, name: &str, table: Table) {
        self.tables.insert(name.to_string(), table);
    }

    pub fn add_artifact(&mut self, artifact: Artifact) {
        if !self.artifacts.contains(&artifact) {
            self.artifacts.push(artifact);
        }
    }

    /// Marca el reporte como incompleto.
    pub fn mark_partial(&mut self, note: impl Into<String>) {
        self.partial = true;
        self.notes.push(note.into());
    }
}
