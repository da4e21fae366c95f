//! Backend de cache en disco: `<dir>/<fingerprint>.json` con el
//! `FlowResult` completo. Escritura vía archivo temporal + rename, de modo
//! que un lector nunca ve una entrada a medio escribir.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use eda_core::{CacheBackend, Fingerprint, FlowResult};

use crate::error::PersistenceError;

#[derive(Debug, Clone)]
pub struct FsCacheBackend {
    dir: PathBuf,
}

impl FsCacheBackend {
    /// Crea el directorio si no existe.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, fingerprint: &Fingerprint) -> Result<PathBuf, PersistenceError> {
        let hex = fingerprint.as_str();
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PersistenceError::InvalidFingerprint(hex.to_string()));
        }
        Ok(self.dir.join(format!("{hex}.json")))
    }

    pub fn read(&self, fingerprint: &Fingerprint) -> Result<Option<FlowResult>, PersistenceError> {
        let path = self.entry_path(fingerprint)?;
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::io(path, e)),
        };
        let result = serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Corrupt { path, source })?;
        Ok(Some(result))
    }

    /// Devuelve `false` si la entrada ya existía.
    pub fn write(&self, fingerprint: &Fingerprint, result: &FlowResult) -> Result<bool, PersistenceError> {
        let path = self.entry_path(fingerprint)?;
        if path.exists() {
            return Ok(false);
        }
        let body = serde_json::to_vec_pretty(result).map_err(|source| PersistenceError::Corrupt { path: path.clone(),
                                                                                                  source })?;
        let tmp = self.dir.join(format!(".{}.{}.tmp", fingerprint.as_str(), std::process::id()));
        fs::write(&tmp, body).map_err(|e| PersistenceError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| {
                                   let _ = fs::remove_file(&tmp);
                                   PersistenceError::io(&path, e)
                               })?;
        Ok(true)
    }
}

impl CacheBackend for FsCacheBackend {
    fn load(&self, fingerprint: &Fingerprint) -> Option<FlowResult> {
        match self.read(fingerprint) {
            Ok(found) => found.filter(|r| r.is_success() && &r.fingerprint == fingerprint),
            Err(e) => {
                log::warn!("cache entry ignored: {e}");
                None
            }
        }
    }

    fn store(&self, fingerprint: &Fingerprint, result: &FlowResult) {
        if !result.is_success() {
            return;
        }
        match self.write(fingerprint, result) {
            Ok(true) => log::debug!("cached {} ({})", result.flow, fingerprint.short()),
            Ok(false) => {}
            Err(e) => log::warn!("could not persist {}: {e}", result.flow),
        }
    }
}
