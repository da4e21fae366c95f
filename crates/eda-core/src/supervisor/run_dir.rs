//! Directorio de ejecución de un nodo:
//! `<run_root>/<design>/<flow>_<fingerprint[:16]>/` con `reports/`,
//! `outputs/`, el log de la herramienta, `settings.json` y el stamp
//! `status.json`.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::constants::{LOG_FILE, OUTPUTS_DIR, REPORTS_DIR, SETTINGS_FILE, STAMP_FILE};
use crate::model::{Fingerprint, FlowResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn for_node(run_root: &Path, design_name: &str, flow: &str, fingerprint: &Fingerprint) -> Self {
        Self::new(run_root.join(sanitize(design_name))
                          .join(format!("{}_{}", sanitize(flow), fingerprint.short())))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join(REPORTS_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn stamp_path(&self) -> PathBuf {
        self.root.join(STAMP_FILE)
    }

    /// Resuelve una ruta relativa al directorio; las absolutas se respetan.
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }

    /// Deja el directorio limpio: sólo se llega aquí en un miss de cache,
    /// así que cualquier contenido previo es de una ejecución no reutilizable.
    pub fn prepare(&self) -> io::Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(self.reports_dir())?;
        fs::create_dir_all(self.outputs_dir())?;
        Ok(())
    }

    pub fn write_settings(&self, value: &Value) -> io::Result<()> {
        write_json(&self.settings_path(), value)
    }

    pub fn write_stamp(&self, result: &FlowResult) -> io::Result<()> {
        let value = serde_json::to_value(result).map_err(io::Error::other)?;
        write_json(&self.stamp_path(), &value)
    }

    pub fn read_stamp(&self) -> io::Result<FlowResult> {
        let bytes = fs::read(self.stamp_path())?;
        serde_json::from_slice(&bytes).map_err(io::Error::other)
    }
}

fn write_json(path: &Path, value: &Value) -> io::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, text)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect()
}
