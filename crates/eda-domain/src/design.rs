//! Design: descripción inmutable de un diseño HDL.
//!
//! - `sources` mantiene el orden declarado (el orden de compilación importa
//!   en VHDL), por eso la forma normalizada también lo conserva.
//! - `rtl_hash` sólo depende del contenido de las fuentes y de los
//!   parámetros; `fingerprint_value` añade rutas, top y clocks porque los
//!   scripts generados los referencian.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::errors::DomainError;

/// Lenguaje de una fuente HDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Vhdl,
    Verilog,
    SystemVerilog,
    Other,
}

impl SourceKind {
    /// Deduce el lenguaje a partir de la extensión.
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension()
                      .and_then(|e| e.to_str())
                      .map(|e| e.to_ascii_lowercase())
                      .unwrap_or_default();
        match ext.as_str() {
            "vhd" | "vhdl" => SourceKind::Vhdl,
            "v" | "vh" => SourceKind::Verilog,
            "sv" | "svh" => SourceKind::SystemVerilog,
            _ => SourceKind::Other,
        }
    }
}

/// Fuente HDL referenciada por ruta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Lenguaje explícito; si falta se deduce de la extensión.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<SourceKind>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(),
               language: None }
    }

    pub fn kind(&self) -> SourceKind {
        self.language.unwrap_or_else(|| SourceKind::from_path(&self.path))
    }

    /// sha256 (hex) del contenido del archivo.
    pub fn content_hash(&self) -> Result<String, DomainError> {
        let bytes = fs::read(&self.path).map_err(|e| DomainError::SourceUnreadable { path: self.path.display().to_string(),
                                                                                     reason: e.to_string() })?;
        Ok(hex_sha256(&bytes))
    }

    fn normalized(&self) -> Result<Value, DomainError> {
        Ok(json!({
            "path": self.path.display().to_string(),
            "kind": self.kind(),
            "sha256": self.content_hash()?,
        }))
    }
}

/// Puerto de clock del diseño.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub name: String,
    pub port: String,
}

/// Testbench opcional (sólo lo usan los flujos de simulación).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testbench {
    #[serde(default)]
    pub sources: Vec<SourceFile>,
    #[serde(default)]
    pub top: Option<String>,
}

impl Testbench {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.top.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub name: String,
    pub sources: Vec<SourceFile>,
    pub top: String,
    #[serde(default)]
    pub clocks: Vec<Clock>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Testbench::is_empty")]
    pub testbench: Testbench,
}

impl Design {
    pub fn new(name: impl Into<String>, top: impl Into<String>) -> Self {
        Self { name: name.into(),
               sources: Vec::new(),
               top: top.into(),
               clocks: Vec::new(),
               parameters: BTreeMap::new(),
               testbench: Testbench::default() }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(SourceFile::new(path));
        self
    }

    pub fn with_clock(mut self, name: impl Into<String>, port: impl Into<String>) -> Self {
        self.clocks.push(Clock { name: name.into(),
                                 port: port.into() });
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_testbench(mut self, top: impl Into<String>, sources: Vec<PathBuf>) -> Self {
        self.testbench = Testbench { sources: sources.into_iter().map(SourceFile::new).collect(),
                                     top: Some(top.into()) };
        self
    }

    /// Clock principal: el único declarado o el llamado `main_clock`.
    pub fn main_clock(&self) -> Option<&Clock> {
        if self.clocks.len() == 1 {
            return self.clocks.first();
        }
        self.clocks.iter().find(|c| c.name == "main_clock")
    }

    /// Valida el diseño y devuelve todos los problemas encontrados juntos.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name must not be empty".to_string());
        }
        if self.top.trim().is_empty() {
            problems.push("top must not be empty".to_string());
        }
        if self.sources.is_empty() {
            problems.push("at least one source file is required".to_string());
        }
        for src in self.sources.iter().chain(self.testbench.sources.iter()) {
            if !src.path.is_file() {
                problems.push(format!("source file {} does not exist", src.path.display()));
            }
        }
        let mut seen = std::collections::BTreeSet::new();
        for clk in &self.clocks {
            if !seen.insert(clk.name.as_str()) {
                problems.push(format!("duplicate clock name {}", clk.name));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidDesign(problems))
        }
    }

    /// Hash del RTL independiente de rutas y orden: hashes de contenido
    /// ordenados + `param=valor` ordenados.
    pub fn rtl_hash(&self) -> Result<String, DomainError> {
        let mut parts: Vec<String> = self.sources
                                         .iter()
                                         .map(|s| s.content_hash())
                                         .collect::<Result<_, _>>()?;
        parts.sort();
        parts.extend(self.parameters.iter().map(|(k, v)| format!("{k}={v}")));
        Ok(hex_sha256(parts.join(", ").as_bytes()))
    }

    /// Forma normalizada que entra al fingerprint de cada nodo.
    pub fn fingerprint_value(&self) -> Result<Value, DomainError> {
        let sources: Vec<Value> = self.sources.iter().map(|s| s.normalized()).collect::<Result<_, _>>()?;
        let tb_sources: Vec<Value> = self.testbench
                                         .sources
                                         .iter()
                                         .map(|s| s.normalized())
                                         .collect::<Result<_, _>>()?;
        let mut clocks: Vec<&Clock> = self.clocks.iter().collect();
        clocks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(json!({
            "top": self.top,
            "sources": sources,
            "clocks": clocks,
            "parameters": self.parameters,
            "testbench": { "top": self.testbench.top, "sources": tb_sources },
        }))
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        p
    }

    #[test]
    fn source_kind_from_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a/top.VHD")), SourceKind::Vhdl);
        assert_eq!(SourceKind::from_path(Path::new("core.sv")), SourceKind::SystemVerilog);
        assert_eq!(SourceKind::from_path(Path::new("core.v")), SourceKind::Verilog);
        assert_eq!(SourceKind::from_path(Path::new("notes.txt")), SourceKind::Other);
    }

    #[test]
    fn validate_collects_every_problem() {
        let d = Design::new("", "").with_clock("clk", "clk").with_clock("clk", "clk2");
        match d.validate() {
            Err(DomainError::InvalidDesign(p)) => assert_eq!(p.len(), 4, "{p:?}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rtl_hash_ignores_paths_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.v", "module a; endmodule\n");
        let b = write(dir.path(), "b.v", "module b; endmodule\n");
        let b_copy = write(dir.path(), "b_copy.v", "module b; endmodule\n");
        let d1 = Design::new("x", "a").with_source(&a).with_source(&b);
        let d2 = Design::new("x", "a").with_source(&b_copy).with_source(&a);
        assert_eq!(d1.rtl_hash().unwrap(), d2.rtl_hash().unwrap());
        // pero la forma normalizada sí distingue rutas
        assert_ne!(d1.fingerprint_value().unwrap(), d2.fingerprint_value().unwrap());
    }

    #[test]
    fn content_change_changes_fingerprint_value() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.v", "module a; endmodule\n");
        let d = Design::new("x", "a").with_source(&a);
        let before = d.fingerprint_value().unwrap();
        write(dir.path(), "a.v", "module a(input x); endmodule\n");
        assert_ne!(before, d.fingerprint_value().unwrap());
    }

    #[test]
    fn missing_source_is_reported() {
        let d = Design::new("x", "a").with_source("/nonexistent/a.v");
        assert!(matches!(d.fingerprint_value(), Err(DomainError::SourceUnreadable { .. })));
    }
}
