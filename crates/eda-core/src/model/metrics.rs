//! Métricas y tablas extraídas de los reportes de herramientas.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Nombres de métricas compartidos entre parsers y políticas.
pub mod keys {
    pub const ERRORS: &str = "errors";
    pub const CRITICAL_WARNINGS: &str = "critical_warnings";
    pub const WARNINGS: &str = "warnings";
    /// Worst negative slack (setup), ns.
    pub const WNS: &str = "wns";
    /// Worst hold slack, ns.
    pub const WHS: &str = "whs";
    pub const TNS: &str = "tns";
    pub const CLOCK_PERIOD: &str = "clock_period";
    pub const FMAX_MHZ: &str = "fmax_mhz";
    pub const TESTS_PASSED: &str = "tests_passed";
    pub const TESTS_FAILED: &str = "tests_failed";
    // utilización
    pub const CELLS: &str = "cells";
    pub const LUT: &str = "lut";
    pub const FF: &str = "ff";
    pub const LATCH: &str = "latch";
    pub const BRAM_TILE: &str = "bram_tile";
    pub const DSP: &str = "dsp";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            MetricValue::Number(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{n}"),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

pub type Metrics = BTreeMap<String, MetricValue>;

/// Tabla con cabecera (p.ej. utilización por recurso).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(),
               rows: Vec::new() }
    }

    /// Agrega una fila; se rellena o recorta al número de columnas.
    pub fn push_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        let mut cells: Vec<String> = row.into_iter().map(Into::into).collect();
        cells.resize(self.columns.len(), String::new());
        self.rows.push(cells);
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Celda de la primera fila cuya primera columna es `key`.
    pub fn lookup(&self, key: &str, column: &str) -> Option<&str> {
        let col = self.column(column)?;
        self.rows
            .iter()
            .find(|r| r.first().map(|c| c == key).unwrap_or(false))
            .and_then(|r| r.get(col))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookup_by_row_key() {
        let mut t = Table::new(["Site Type", "Used", "Available"]);
        t.push_row(["Slice LUTs", "120", "20800"]);
        t.push_row(["Register"]);
        assert_eq!(t.lookup("Slice LUTs", "used"), Some("120"));
        assert_eq!(t.rows[1].len(), 3);
        assert_eq!(t.lookup("DSPs", "Used"), None);
    }

    #[test]
    fn metric_values_serialize_untagged() {
        let m: Metrics = [("wns".to_string(), MetricValue::from(-0.25)), ("part".to_string(), "xc7".into())].into();
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["wns"], -0.25);
        assert_eq!(v["part"], "xc7");
    }
}
