//! Settings de flujo: esquema declarativo, resolución por capas y la forma
//! resuelta (`Settings`) que consumen SETUP, PARSE y las políticas.

pub mod resolve;
pub mod schema;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use resolve::{resolve_settings, SettingsLayers};
pub use schema::{FieldSpec, FieldType, NumRange, SettingsSchema};

/// Settings resueltos y validados de un nodo.
///
/// `values` sólo contiene campos conocidos por el esquema, ya normalizados
/// (tiempos en ns, frecuencias en MHz). Los campos desconocidos quedan en
/// `extra` y nunca se mezclan con los tipados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    flow: String,
    values: BTreeMap<String, Value>,
    #[serde(default)]
    extra: BTreeMap<String, Value>,
}

impl Settings {
    pub(crate) fn from_parts(flow: String, values: BTreeMap<String, Value>, extra: BTreeMap<String, Value>) -> Self {
        Self { flow, values, extra }
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_str_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    pub fn get_path(&self, name: &str) -> Option<PathBuf> {
        self.get_str(name).map(PathBuf::from)
    }

    /// Forma canónica que entra al fingerprint y a `settings.json`.
    pub fn normalized(&self) -> Value {
        json!({ "values": self.values, "extra": self.extra })
    }
}
