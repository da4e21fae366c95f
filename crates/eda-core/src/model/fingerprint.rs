use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::DIR_NAME_HASH_LEN;
use crate::hashing::hash_value;
use crate::model::ToolIdentity;

/// Hash hex (blake3) que identifica un nodo: igualdad de fingerprint implica
/// resultado reutilizable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Fingerprint(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefijo usado en nombres de directorio.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(DIR_NAME_HASH_LEN);
        &self.0[..end]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insumos del fingerprint de un nodo. NO es el fingerprint final sino el
/// modelo previo a canonicalizar.
///
/// Las dependencias no entran: son función determinista de
/// `flow_kind` + `settings`, así que ya están cubiertas.
#[derive(Debug)]
pub struct NodeFingerprintInput<'a> {
    pub engine_version: &'a str,
    pub flow_kind: &'a str,
    pub design: &'a Value,
    pub settings: &'a Value,
    pub tool: Option<&'a ToolIdentity>,
}

impl NodeFingerprintInput<'_> {
    pub fn to_value(&self) -> Value {
        json!({
            "engine_version": self.engine_version,
            "flow": self.flow_kind,
            "design": self.design,
            "settings": self.settings,
            "tool": self.tool,
        })
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint(hash_value(&self.to_value()))
    }
}
